//! Issuer — turns a newly registered device into an operator notification
//! carrying one capability link per management action.
//!
//! The issuer performs no I/O of its own; publishing the assembled message is
//! the notification channel's job.

use chrono::{DateTime, Utc};

use crate::capability::{self, Action};

/// Metadata from a registration event. `name` and `device_type` default to
/// empty when the event omits them.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub device_id: String,
    pub name: String,
    pub device_type: String,
}

/// One capability link per management action for a single device.
#[derive(Debug, Clone)]
pub struct ActionLinks {
    pub approve: String,
    pub block: String,
    pub remove: String,
}

/// Build the URL a minted token is delivered in.
pub fn action_link(base_url: &str, device_id: &str, action: Action, token: &str) -> String {
    format!(
        "{}/devices/{}/{}?token={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(device_id),
        action.as_str(),
        urlencoding::encode(token),
    )
}

/// Mint the three action tokens for a device and wrap each in a followable
/// link. All three share the same issuance instant and TTL.
pub fn mint_action_links(
    secret: &str,
    base_url: &str,
    device_id: &str,
    now: DateTime<Utc>,
    ttl_secs: i64,
) -> Result<ActionLinks, jsonwebtoken::errors::Error> {
    let link = |action: Action| -> Result<String, jsonwebtoken::errors::Error> {
        let token = capability::mint(secret, device_id, action, now, ttl_secs)?;
        Ok(action_link(base_url, device_id, action, &token))
    };
    Ok(ActionLinks {
        approve: link(Action::Approve)?,
        block: link(Action::Block)?,
        remove: link(Action::Remove)?,
    })
}

/// Build the notification text for a newly registered device.
///
/// `links` is `None` when no signing secret is configured: the message then
/// omits the management section entirely rather than carrying unverifiable
/// links, and the notification still goes out.
pub fn registration_message(device: &DeviceInfo, links: Option<&ActionLinks>) -> String {
    let mut text = format!(
        "New device registered:\n  deviceId: {}\n  type:     {}\n  name:     {}\n",
        device.device_id, device.device_type, device.name
    );
    if let Some(links) = links {
        text.push_str(
            "\nYou can approve, block or remove this device. \
             Do nothing and it stays in 'pending' status.\n",
        );
        text.push_str(&format!("Approve: {}\n", links.approve));
        text.push_str(&format!("Block:   {}\n", links.block));
        text.push_str(&format!("Remove:  {}\n", links.remove));
    }
    text
}

// ── Tests ────────────────────────────────────────────────────
