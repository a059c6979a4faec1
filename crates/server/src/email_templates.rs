//! Email rendering: HTML via Askama plus a plain text alternative.
//!
//! Askama escapes every interpolated value, so event fields supplied by
//! clients cannot inject markup into the emails.

use crate::notify::event::{AlertEvent, BroadcastEvent, Contact};
use crate::notify::transport::RenderedMessage;
use askama::Template;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

const UNKNOWN: &str = "Unknown";

/// Formats a client-provided RFC 3339 timestamp as `YYYY-MM-DD HH:MM` in the
/// offset the client sent, followed by that offset (`UTC`, `UTC+02:00`).
/// Falls back to the raw value when it cannot be parsed.
pub fn display_time(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return UNKNOWN.to_string();
    };
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .and_then(|t| {
            let local = t
                .format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
                .ok()?;
            let offset = t.offset();
            if offset.is_utc() {
                return Some(format!("{local} UTC"));
            }
            let offset = offset
                .format(format_description!(
                    "[offset_hour sign:mandatory]:[offset_minute]"
                ))
                .ok()?;
            Some(format!("{local} UTC{offset}"))
        })
        .unwrap_or_else(|| raw.to_string())
}

fn or_unknown(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

fn contact_line(contact: &Contact) -> String {
    let mut line = contact.name.clone().unwrap_or_default();
    if let Some(relation) = contact.relation.as_deref().filter(|r| !r.is_empty()) {
        line.push_str(&format!(" ({relation})"));
    }
    for detail in [&contact.phone, &contact.email].into_iter().flatten() {
        if !detail.is_empty() {
            line.push_str(" • ");
            line.push_str(detail);
        }
    }
    line.trim_start_matches(" • ").trim().to_string()
}

#[derive(Template)]
#[template(path = "alert_email.html")]
pub struct AlertEmailTemplate {
    pub name: String,
    pub phone: String,
    pub location: String,
    pub time: String,
    pub gps: Option<String>,
    pub maps_link: Option<String>,
    pub photo: Option<String>,
    pub contacts: Vec<String>,
}

impl AlertEmailTemplate {
    pub fn from_alert(alert: &AlertEvent) -> Self {
        let gps = match (alert.latitude, alert.longitude) {
            (Some(lat), Some(lng)) => Some(format!("{lat}, {lng}")),
            _ => None,
        };
        Self {
            name: or_unknown(alert.name.as_deref()),
            phone: or_unknown(alert.phone.as_deref()),
            location: or_unknown(alert.location.as_deref()),
            time: display_time(alert.time.as_deref()),
            gps,
            maps_link: alert.maps_link.clone().filter(|l| !l.is_empty()),
            photo: alert.photo.clone().filter(|p| !p.is_empty()),
            contacts: alert
                .contacts()
                .iter()
                .map(contact_line)
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    pub fn subject(&self) -> String {
        format!("EMERGENCY ALERT - {} needs help!", self.name)
    }

    #[tracing::instrument(skip(self))]
    pub fn render_html(&self) -> Result<String, askama::Error> {
        self.render()
    }

    #[tracing::instrument(skip(self))]
    pub fn render_text(&self) -> String {
        let mut text = format!(
            r#"EMERGENCY ALERT

Someone in your community needs help: {} needs help!

Location: {}
Phone: {}
Time: {}
"#,
            self.name, self.location, self.phone, self.time
        );
        if let Some(gps) = &self.gps {
            text.push_str(&format!("GPS: {gps}\n"));
        }
        if let Some(link) = &self.maps_link {
            text.push_str(&format!("Map: {link}\n"));
        }
        if !self.contacts.is_empty() {
            text.push_str("\nEmergency Contacts:\n");
            for contact in &self.contacts {
                text.push_str(&format!("  - {contact}\n"));
            }
        }
        text.push_str(
            "\nIf you know this person or see them, please respond immediately!\n\n\
             ---\nGuardianshipApp - Community Safety Network",
        );
        text
    }
}

#[derive(Template)]
#[template(path = "broadcast_email.html")]
pub struct BroadcastEmailTemplate {
    pub title: String,
    pub body: String,
    pub admin_email: String,
}

impl BroadcastEmailTemplate {
    pub fn from_broadcast(broadcast: &BroadcastEvent) -> Self {
        Self {
            title: broadcast.title.trim().to_string(),
            body: broadcast.body.clone(),
            admin_email: broadcast.admin_email.clone(),
        }
    }

    pub fn subject(&self) -> String {
        format!("{} - GuardianshipApp", self.title)
    }

    #[tracing::instrument(skip(self))]
    pub fn render_html(&self) -> Result<String, askama::Error> {
        self.render()
    }

    #[tracing::instrument(skip(self))]
    pub fn render_text(&self) -> String {
        format!(
            r#"GuardianshipApp Broadcast
From: {}

{}

{}

---
GuardianshipApp - Community Safety Network"#,
            self.admin_email, self.title, self.body
        )
    }
}

#[derive(Template)]
#[template(path = "clone_report_email.html")]
pub struct CloneReportEmailTemplate {
    pub domain: String,
    pub url: String,
    pub time: String,
}

impl CloneReportEmailTemplate {
    pub fn subject(&self) -> String {
        "Clone Warning: Someone copied your website".to_string()
    }

    pub fn render_html(&self) -> Result<String, askama::Error> {
        self.render()
    }

    pub fn render_text(&self) -> String {
        format!(
            "Website Clone Detected\n\nDomain: {}\nURL: {}\nTime: {}\n\nGuardianshipApp Auto Security System",
            self.domain, self.url, self.time
        )
    }
}

pub fn render_alert(alert: &AlertEvent) -> Result<RenderedMessage, askama::Error> {
    let template = AlertEmailTemplate::from_alert(alert);
    Ok(RenderedMessage {
        subject: template.subject(),
        html: template.render_html()?,
        text: template.render_text(),
    })
}

pub fn render_broadcast(broadcast: &BroadcastEvent) -> Result<RenderedMessage, askama::Error> {
    let template = BroadcastEmailTemplate::from_broadcast(broadcast);
    Ok(RenderedMessage {
        subject: template.subject(),
        html: template.render_html()?,
        text: template.render_text(),
    })
}

pub fn render_clone_report(
    template: &CloneReportEmailTemplate,
) -> Result<RenderedMessage, askama::Error> {
    Ok(RenderedMessage {
        subject: template.subject(),
        html: template.render_html()?,
        text: template.render_text(),
    })
}
