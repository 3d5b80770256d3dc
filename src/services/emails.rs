//! Outbound message builders. Plain subject/body construction only; the
//! exact markup is deliberately minimal.

use crate::models::circumvention_flag::CircumventionFlag;
use crate::models::introduction::Introduction;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::mailer::EmailMessage;

pub fn check_in_email(intro: &Introduction, response_url: &str) -> EmailMessage {
    let subject = format!("Quick check-in about {}", intro.employer_name);
    let html = format!(
        "<p>Hi {},</p>\
         <p>A while back we introduced you to <strong>{}</strong>. Could you let us \
         know where things stand? It takes one click:</p>\
         <p><a href=\"{}\">Update your status</a></p>\
         <p>This link is valid for 7 days. Thanks!</p>",
        intro.candidate_name, intro.employer_name, response_url
    );
    let text = format!(
        "Hi {},\n\nA while back we introduced you to {}. Could you let us know where \
         things stand? Update your status here (valid 7 days): {}\n",
        intro.candidate_name, intro.employer_name, response_url
    );
    EmailMessage {
        to: intro.candidate_email.clone(),
        subject,
        html,
        text: Some(text),
    }
}

pub fn expiry_warning_email(intro: &Introduction, days_left: i64) -> EmailMessage {
    let subject = format!(
        "Protection period for {} ends in {} days",
        intro.candidate_name, days_left
    );
    let html = format!(
        "<p>The introduction protection period for candidate <strong>{}</strong> \
         (employer: {}) ends on {}.</p>",
        intro.candidate_name,
        intro.employer_name,
        intro.protection_ends_at.format("%Y-%m-%d")
    );
    EmailMessage {
        to: intro.billing_email().to_string(),
        subject,
        html,
        text: None,
    }
}

pub fn guarantee_warning_email(intro: &Introduction, ends_on: NaiveDate) -> EmailMessage {
    let subject = format!(
        "Placement guarantee for {} ends on {}",
        intro.candidate_name, ends_on
    );
    let html = format!(
        "<p>The placement guarantee window for <strong>{}</strong> at {} ends on {}.</p>",
        intro.candidate_name, intro.employer_name, ends_on
    );
    EmailMessage {
        to: intro.billing_email().to_string(),
        subject,
        html,
        text: None,
    }
}

pub fn admin_flag_alert(
    admin_email: &str,
    intro: &Introduction,
    flag: &CircumventionFlag,
    raw_excerpt: Option<&str>,
) -> EmailMessage {
    let subject = format!(
        "Circumvention flag opened: {} / {}",
        intro.employer_name, intro.candidate_name
    );
    let mut html = format!(
        "<p>A circumvention flag was opened.</p>\
         <ul>\
         <li>Employer: {}</li>\
         <li>Candidate: {}</li>\
         <li>Detection: {}</li>\
         <li>Flag id: {}</li>\
         </ul>",
        intro.employer_name,
        intro.candidate_name,
        flag.detection_method.as_str(),
        flag.id
    );
    if let Some(excerpt) = raw_excerpt {
        html.push_str(&format!(
            "<p>Original reply (excerpt):</p><blockquote>{}</blockquote>",
            excerpt
        ));
    }
    EmailMessage {
        to: admin_email.to_string(),
        subject,
        html,
        text: None,
    }
}

pub fn invoice_email(
    to: &str,
    intro: &Introduction,
    invoice_number: &str,
    amount: Decimal,
    due_date: NaiveDate,
    custom_message: Option<&str>,
) -> EmailMessage {
    let subject = format!("Placement fee invoice {}", invoice_number);
    let mut html = format!(
        "<p>Invoice <strong>{}</strong> for the placement of {} at {}.</p>\
         <p>Amount due: ${}<br>Due date: {}</p>",
        invoice_number, intro.candidate_name, intro.employer_name, amount, due_date
    );
    if let Some(message) = custom_message {
        html.push_str(&format!("<p>{}</p>", message));
    }
    EmailMessage {
        to: to.to_string(),
        subject,
        html,
        text: None,
    }
}
