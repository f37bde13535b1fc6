/// Message bodies for notifications
use super::ReviewLinks;
use crate::db::{agent::Agent, customer::Customer};

/// Escape text for inclusion in HTML
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wrap a body in the shared email/page chrome
pub fn layout(title: &str, accent: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  <style>
    body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 0; padding: 0; background: #f4f4f8; }}
    .container {{ max-width: 600px; margin: 40px auto; background: white; border-radius: 20px; overflow: hidden; }}
    .header {{ background: {accent}; color: white; padding: 32px; text-align: center; }}
    .content {{ padding: 32px; color: #444; line-height: 1.6; }}
    .btn {{ display: inline-block; padding: 12px 24px; border-radius: 24px; color: white; text-decoration: none; font-weight: bold; margin: 0 8px; }}
    .footer {{ background: #f8f9fa; padding: 24px; text-align: center; color: #666; font-size: 13px; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="header"><h2>Owode Agent</h2><div>{title}</div></div>
    <div class="content">{body}</div>
    <div class="footer">This is an automated notification from the Owode Agent Management System</div>
  </div>
</body>
</html>"#,
        title = escape_html(title),
        accent = accent,
        body = body,
    )
}

pub fn agent_registered(agent: &Agent) -> String {
    layout(
        "New Agent Registration",
        "#667eea",
        &format!(
            "<p>A new agent has registered and is waiting for approval.</p>\
             <ul><li><strong>Name:</strong> {}</li>\
             <li><strong>Email:</strong> {}</li>\
             <li><strong>Phone:</strong> {}</li>\
             <li><strong>Agent ID:</strong> {}</li></ul>",
            escape_html(&agent.full_name()),
            escape_html(&agent.email),
            escape_html(&agent.phone),
            escape_html(&agent.id),
        ),
    )
}

pub fn agent_approved(agent: &Agent) -> String {
    layout(
        "Account Approved",
        "#4CAF50",
        &format!(
            "<p>Dear {},</p>\
             <p>Your agent account has been approved. You can now sign in, create customer \
             profiles and record contributions.</p>\
             <p>If you have any questions, feel free to contact our support team.</p>",
            escape_html(&agent.full_name()),
        ),
    )
}

pub fn customer_welcome(customer: &Customer) -> String {
    layout(
        "Your Account is Ready",
        "#667eea",
        &format!(
            "<p>Welcome {}!</p>\
             <p>Your savings account has been successfully created.</p>\
             <p><strong>Contribution plan:</strong> ₦{} {}</p>\
             <p>Your agent will be in touch soon with more details.</p>",
            escape_html(&customer.full_name()),
            customer.contribution_amount,
            customer.contribution_frequency,
        ),
    )
}

pub fn payment_sms(customer: &Customer, amount: i64) -> String {
    format!(
        "Dear {}, you have made a payment of ₦{}. Your new balance is ₦{}. Contribution frequency: {}.",
        customer.full_name(),
        amount,
        customer.balance,
        customer.contribution_frequency
    )
}

pub fn payment_email(customer: &Customer, amount: i64) -> String {
    layout(
        "Payment Confirmation",
        "#4CAF50",
        &format!(
            "<p>Dear {},</p>\
             <p>We have received your payment.</p>\
             <ul><li><strong>Amount paid:</strong> ₦{}</li>\
             <li><strong>New balance:</strong> ₦{}</li></ul>\
             <p>Continue your {} contribution schedule to maintain your progress.</p>",
            escape_html(&customer.full_name()),
            amount,
            customer.balance,
            customer.contribution_frequency,
        ),
    )
}

pub fn deletion_requested(
    customer: &Customer,
    agent: &Agent,
    reason: &str,
    links: &ReviewLinks,
) -> String {
    layout(
        "Customer Deletion Request",
        "#ff6b6b",
        &format!(
            "<p>Agent <strong>{}</strong> ({}) asked to delete a customer.</p>\
             <ul><li><strong>Customer:</strong> {}</li>\
             <li><strong>Phone:</strong> {}</li>\
             <li><strong>Balance:</strong> ₦{}</li>\
             <li><strong>Reason:</strong> {}</li></ul>\
             <p style=\"text-align:center\">\
             <a class=\"btn\" style=\"background:#4CAF50\" href=\"{}\">Approve</a>\
             <a class=\"btn\" style=\"background:#ff6b6b\" href=\"{}\">Deny</a></p>",
            escape_html(&agent.full_name()),
            escape_html(&agent.email),
            escape_html(&customer.full_name()),
            escape_html(&customer.phone),
            customer.balance,
            escape_html(reason),
            escape_html(&links.approve_url),
            escape_html(&links.deny_url),
        ),
    )
}

pub fn deletion_resolved(customer: &Customer, approved: bool) -> String {
    if approved {
        layout(
            "Customer Deletion Approved",
            "#4CAF50",
            &format!(
                "<p>The customer <strong>{}</strong> has been successfully deleted from the system.</p>",
                escape_html(&customer.full_name()),
            ),
        )
    } else {
        layout(
            "Customer Deletion Denied",
            "#ff6b6b",
            &format!(
                "<p>Your request to delete the customer <strong>{}</strong> has been denied by \
                 the administrator. The customer account remains active.</p>",
                escape_html(&customer.full_name()),
            ),
        )
    }
}

/// Page shown to the admin after following a review link
pub fn review_page(title: &str, message: &str, dashboard_url: &str) -> String {
    layout(
        title,
        "#667eea",
        &format!(
            "<p>{}</p><p style=\"text-align:center\">\
             <a class=\"btn\" style=\"background:#667eea\" href=\"{}\">Back to Admin Dashboard</a></p>",
            message,
            escape_html(dashboard_url),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>Tom & \"Jerry\"</b>"),
            "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_layout_escapes_title_only() {
        let html = layout("A < B", "#000", "<p>kept</p>");
        assert!(html.contains("A &lt; B"));
        assert!(html.contains("<p>kept</p>"));
    }
}
