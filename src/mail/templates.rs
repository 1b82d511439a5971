use std::sync::LazyLock;

use tera::{Context, Tera};

use crate::error::AppError;
use crate::mail::mailer::EmailMessage;

const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>{{ title }}</title></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="background: linear-gradient(to right, #0077B5, #00A0DC); padding: 30px; text-align: center; border-radius: 10px 10px 0 0;">
    <h1 style="color: white; margin: 0;">{{ title }}</h1>
  </div>
  <div style="background-color: #ffffff; padding: 30px; border-radius: 0 0 10px 10px;">
    {% block content %}{% endblock content %}
    <div style="text-align: center; margin: 30px 0;">
      <a href="{{ cta_url | safe }}" style="background-color: #0077B5; color: white; padding: 14px 28px; text-decoration: none; border-radius: 30px; font-weight: bold;">{{ cta_label }}</a>
    </div>
    <p>Best regards,<br>The UnLinked Team</p>
  </div>
</body>
</html>"#;

const WELCOME: &str = r#"{% extends "layout.html" %}
{% block content %}
<p>Hello {{ name }},</p>
<p>We're thrilled to have you join our professional community! UnLinked is your place to connect, share, and grow.</p>
<p>Start by completing your profile and connecting with colleagues.</p>
{% endblock content %}"#;

const COMMENT: &str = r#"{% extends "layout.html" %}
{% block content %}
<p>Hello {{ recipient_name }},</p>
<p>{{ commenter_name }} commented on your post:</p>
<blockquote style="background-color: #f3f6f8; border-left: 4px solid #0077B5; padding: 15px; margin: 20px 0;">{{ comment }}</blockquote>
{% endblock content %}"#;

const CONNECTION_ACCEPTED: &str = r#"{% extends "layout.html" %}
{% block content %}
<p>Hello {{ sender_name }},</p>
<p>Great news! <strong>{{ recipient_name }}</strong> has accepted your connection request on UnLinked.</p>
<p>You can now message each other and see each other's updates.</p>
{% endblock content %}"#;

/// Email templates, compiled once. Names end in `.html` so Tera autoescapes every value.
static TEMPLATES: LazyLock<Result<Tera, tera::Error>> = LazyLock::new(|| {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("layout.html", LAYOUT),
        ("welcome.html", WELCOME),
        ("comment.html", COMMENT),
        ("connection_accepted.html", CONNECTION_ACCEPTED),
    ])?;
    Ok(tera)
});

fn render(template: &str, context: &Context) -> Result<String, AppError> {
    let tera = TEMPLATES
        .as_ref()
        .map_err(|e| AppError::Mail(format!("Email templates failed to compile: {e}")))?;
    tera.render(template, context)
        .map_err(|e| AppError::Mail(format!("Failed to render {template}: {e}")))
}

/// Shared layout values. `cta_url` is inserted unescaped, so callers build it from
/// [`profile_url`] or [`post_url`], which percent-encode user input.
fn layout_context(title: &str, cta_url: &str, cta_label: &str) -> Context {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("cta_url", cta_url);
    context.insert("cta_label", cta_label);
    context
}

pub fn profile_url(client_url: &str, username: &str) -> String {
    format!(
        "{}/profile/{}",
        client_url.trim_end_matches('/'),
        urlencoding::encode(username)
    )
}

pub fn post_url(client_url: &str, post_id: &str) -> String {
    format!(
        "{}/post/{}",
        client_url.trim_end_matches('/'),
        urlencoding::encode(post_id)
    )
}

/// Welcome email sent after signup.
pub fn welcome_email(to: &str, name: &str, profile_url: &str) -> Result<EmailMessage, AppError> {
    let mut context = layout_context("Welcome to UnLinked!", profile_url, "Complete Your Profile");
    context.insert("name", name);

    Ok(EmailMessage {
        to: to.to_string(),
        subject: "Welcome to UnLinked".to_string(),
        text: format!("Welcome to UnLinked, {name}!"),
        html: render("welcome.html", &context)?,
        category: "welcome",
    })
}

/// Email sent to a post author when someone comments on the post.
pub fn comment_notification_email(
    to: &str,
    recipient_name: &str,
    commenter_name: &str,
    post_url: &str,
    comment: &str,
) -> Result<EmailMessage, AppError> {
    let mut context = layout_context("New Comment on Your Post", post_url, "View Comment");
    context.insert("recipient_name", recipient_name);
    context.insert("commenter_name", commenter_name);
    context.insert("comment", comment);

    Ok(EmailMessage {
        to: to.to_string(),
        subject: "New Comment on Your Post".to_string(),
        text: format!("{commenter_name} commented on your post: {comment}"),
        html: render("comment.html", &context)?,
        category: "comment_notification",
    })
}

/// Email sent to the requester when their connection request is accepted.
pub fn connection_accepted_email(
    to: &str,
    sender_name: &str,
    recipient_name: &str,
    profile_url: &str,
) -> Result<EmailMessage, AppError> {
    let mut context = layout_context("Connection Accepted!", profile_url, "View Profile");
    context.insert("sender_name", sender_name);
    context.insert("recipient_name", recipient_name);

    Ok(EmailMessage {
        to: to.to_string(),
        subject: format!("{recipient_name} accepted your connection request"),
        text: format!("{recipient_name} has accepted your connection request!"),
        html: render("connection_accepted.html", &context)?,
        category: "connection_accepted",
    })
}
