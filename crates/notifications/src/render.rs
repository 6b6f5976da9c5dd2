use crate::{NotificationEmail, Recipient};
use anyhow::Context;
use models::{Notification, NotificationType};

const SUBJECT: &str = "notification-subject";
const BODY: &str = "notification-body";

/// Renderer renders Notifications into NotificationEmails.
#[derive(Debug)]
pub struct Renderer {
    registry: handlebars::Handlebars<'static>,
    product_name: String,
    dashboard_url: Option<String>,
}

fn icon(type_: NotificationType) -> &'static str {
    match type_ {
        NotificationType::Error => "🔴",
        NotificationType::Warning => "⚠️",
        NotificationType::Maintenance => "🔧",
        NotificationType::System => "⚙️",
        _ => "ℹ️",
    }
}

fn accent_color(type_: NotificationType) -> &'static str {
    match type_ {
        NotificationType::Error => "#dc3545",
        NotificationType::Warning => "#ffc107",
        NotificationType::Info => "#0d6efd",
        NotificationType::Maintenance => "#17a2b8",
        _ => "#6c757d",
    }
}

impl Renderer {
    pub fn try_new(
        product_name: impl Into<String>,
        dashboard_url: Option<&url::Url>,
    ) -> anyhow::Result<Renderer> {
        let mut registry = handlebars::Handlebars::new();
        registry.register_escape_fn(handlebars::html_escape);

        registry
            .register_template_string(SUBJECT, r#"{{icon}} {{{product_name}}} - {{{title}}}"#)
            .context("registering notification subject template")?;

        registry
            .register_template_string(
                BODY,
                r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #212529; margin: 0; padding: 0;">
<div style="max-width: 600px; margin: 0 auto; padding: 24px;">
    <div style="border-left: 4px solid {{color}}; padding: 12px 16px; background: #f8f9fa;">
        <h2 style="margin: 0 0 8px 0; color: {{color}};">{{title}}</h2>
        <p style="margin: 0;">{{message}}</p>
    </div>
    <p style="color: #6c757d; font-size: 13px;">
        {{#if recipient_name}}Hello {{recipient_name}}, this{{else}}This{{/if}} notification was sent by {{product_name}} on {{created_at}}.
    </p>
    {{#if dashboard_url}}
    <p><a href="{{dashboard_url}}" style="color: {{color}};" target="_blank" rel="noopener">Open the dashboard</a></p>
    {{/if}}
</div>
</body>
</html>"#,
            )
            .context("registering notification body template")?;

        Ok(Renderer {
            registry,
            product_name: product_name.into(),
            dashboard_url: dashboard_url.map(|url| url.to_string()),
        })
    }

    pub fn render_email(
        &self,
        recipient: Recipient,
        notification: &Notification,
    ) -> anyhow::Result<NotificationEmail> {
        let data = serde_json::json!({
            "icon": icon(notification.type_),
            "color": accent_color(notification.type_),
            "product_name": self.product_name,
            "dashboard_url": self.dashboard_url,
            "recipient_name": recipient.full_name,
            "title": notification.title,
            "message": notification.message,
            "created_at": notification.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        });

        let subject = self
            .registry
            .render(SUBJECT, &data)
            .context("rendering notification subject")?;
        let body = self
            .registry
            .render(BODY, &data)
            .context("rendering notification body")?;

        Ok(NotificationEmail {
            idempotency_key: format!("notification-{}", notification.id),
            recipient,
            subject,
            body,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;
    use models::Id;

    fn fixture(type_: NotificationType) -> Notification {
        Notification {
            id: Id(12),
            recipient_id: Id(3),
            title: "Equipment fault".to_string(),
            message: "Unit \"Boiler B2\" in zone \"Restaurant <A>\" has been reported faulty for 2h."
                .to_string(),
            type_,
            is_read: false,
            created_at: chrono::Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_render_email() {
        let renderer = Renderer::try_new(
            "Sobri'Up",
            Some(&url::Url::parse("https://app.sobriup.fr/").unwrap()),
        )
        .unwrap();

        let email = renderer
            .render_email(
                Recipient {
                    email: "ops@example.com".to_string(),
                    full_name: Some("Camille".to_string()),
                },
                &fixture(NotificationType::Error),
            )
            .unwrap();

        assert_eq!(email.idempotency_key, "notification-12");
        assert_eq!(email.subject, "🔴 Sobri'Up - Equipment fault");
        assert!(email.body.contains("border-left: 4px solid #dc3545"));
        assert!(email.body.contains("Restaurant &lt;A&gt;"));
        assert!(email.body.contains("Hello Camille, this notification"));
        assert!(email.body.contains("on 2024-03-01 10:00 UTC."));
        assert!(email.body.contains(r#"href="https://app.sobriup.fr/""#));
    }

    #[test]
    fn test_icons_and_colors_by_type() {
        let renderer = Renderer::try_new("Sobri'Up", None).unwrap();

        for (type_, subject, color) in [
            (NotificationType::Warning, "⚠️ Sobri'Up - Equipment fault", "#ffc107"),
            (NotificationType::Info, "ℹ️ Sobri'Up - Equipment fault", "#0d6efd"),
            (NotificationType::Maintenance, "🔧 Sobri'Up - Equipment fault", "#17a2b8"),
            (NotificationType::System, "⚙️ Sobri'Up - Equipment fault", "#6c757d"),
        ] {
            let email = renderer
                .render_email(
                    Recipient {
                        email: "ops@example.com".to_string(),
                        full_name: None,
                    },
                    &fixture(type_),
                )
                .unwrap();

            assert_eq!(email.subject, subject);
            assert!(email.body.contains(color), "{type_}");
            assert!(email.body.contains("This notification was sent"));
            assert!(!email.body.contains("Open the dashboard"));
        }
    }
}
