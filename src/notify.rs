/// Outbound registration notifications
///
/// Sends the confirmation email through an EmailJS-compatible REST
/// endpoint. Which template is used depends on whether a badge URL is
/// attached: freshly generated badges ride along, volunteers who kept
/// their own badge get the plain confirmation.

use serde_json::json;
use thiserror::Error;

use crate::state::settings::NotifierSettings;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Request(String),
}

pub struct Notifier {
    settings: NotifierSettings,
}

impl Notifier {
    pub fn new(settings: NotifierSettings) -> Self {
        Notifier { settings }
    }

    /// Template id for a send, by badge presence
    fn template_for(&self, has_badge: bool) -> &str {
        if has_badge {
            &self.settings.template_id_badge
        } else {
            &self.settings.template_id_plain
        }
    }

    /// Send the registration confirmation.
    pub fn send(
        &self,
        to_email: &str,
        to_name: &str,
        badge_url: Option<&str>,
    ) -> Result<(), NotifyError> {
        let body = json!({
            "service_id": self.settings.service_id,
            "template_id": self.template_for(badge_url.is_some()),
            "user_id": self.settings.public_key,
            "template_params": {
                "to_name": to_name,
                "to_email": to_email,
                "qrcode_url": badge_url.unwrap_or(""),
            },
        });

        ureq::post(&self.settings.endpoint)
            .send_json(body)
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        println!("📧 Confirmation sent to {}", to_email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> Notifier {
        Notifier::new(NotifierSettings {
            endpoint: "https://api.emailjs.com/api/v1.0/email/send".to_string(),
            service_id: "svc".to_string(),
            template_id_badge: "tpl_badge".to_string(),
            template_id_plain: "tpl_plain".to_string(),
            public_key: "pk".to_string(),
        })
    }

    #[test]
    fn test_template_selection_depends_on_badge_presence() {
        let n = notifier();
        assert_eq!(n.template_for(true), "tpl_badge");
        assert_eq!(n.template_for(false), "tpl_plain");
    }
}
