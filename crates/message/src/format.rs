//! Canonical rendering of a message into the text that gets signed.

use {
    crate::Message,
    chrono::{DateTime, SecondsFormat, Utc},
};

pub(crate) const PREAMBLE: &str = " wants you to sign in with your Ethereum account:";

/// Formats a timestamp the way wallets render them: RFC 3339 in UTC with
/// millisecond precision.
pub fn timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Renders the canonical signable text.
///
/// Deterministic: the same field values always produce the same bytes.
/// Callers are expected to have validated the message and filled `issued_at`
/// first; [`Message::to_signable_string`] does both.
pub fn render(message: &Message) -> String {
    let mut text = format!("{}{PREAMBLE}\n{}\n\n", message.domain, message.address);
    if let Some(statement) = &message.statement {
        text.push_str(statement);
        text.push_str("\n\n");
    }

    let mut fields = vec![
        format!("URI: {}", message.uri),
        format!("Version: {}", message.version),
        format!("Chain ID: {}", message.chain_id),
        format!("Nonce: {}", message.nonce),
        format!(
            "Issued At: {}",
            message.issued_at.as_deref().unwrap_or_default()
        ),
    ];
    if let Some(expiration_time) = &message.expiration_time {
        fields.push(format!("Expiration Time: {expiration_time}"));
    }
    if let Some(not_before) = &message.not_before {
        fields.push(format!("Not Before: {not_before}"));
    }
    if let Some(request_id) = &message.request_id {
        fields.push(format!("Request ID: {request_id}"));
    }
    if let Some(resources) = &message.resources {
        // An empty sequence still renders the list header.
        fields.push("Resources:".to_owned());
        for resource in resources {
            fields.push(format!("- {resource}"));
        }
    }

    text.push_str(&fields.join("\n"));
    text
}

#[cfg(test)]
mod tests {
    use {super::*, crate::MessageFields, chrono::TimeZone};

    fn message() -> Message {
        Message::new(MessageFields {
            domain: "example.com".to_owned(),
            address: "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_owned(),
            uri: "https://example.com/login".to_owned(),
            nonce: Some("abcdefgh12".to_owned()),
            issued_at: Some("2024-01-01T00:00:00.000Z".to_owned()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn renders_minimal_message() {
        let text = message().to_signable_string().unwrap();
        assert_eq!(
            text,
            "example.com wants you to sign in with your Ethereum account:\n\
             0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed\n\
             \n\
             URI: https://example.com/login\n\
             Version: 1\n\
             Chain ID: 1\n\
             Nonce: abcdefgh12\n\
             Issued At: 2024-01-01T00:00:00.000Z"
        );
    }

    #[test]
    fn renders_statement_block_and_optional_fields() {
        let mut message = Message {
            statement: Some("I accept the terms of service".to_owned()),
            expiration_time: Some("2024-01-02T00:00:00.000Z".to_owned()),
            not_before: Some("2024-01-01T12:00:00.000Z".to_owned()),
            request_id: Some("request-7".to_owned()),
            resources: Some(vec![
                "ipfs://bafybeiemxf5abjwjbikoz4mc3a3dla6ual3jsgpdr4cjr3oz3evfyavhwq".to_owned(),
                "https://example.com/my-web2-claim.json".to_owned(),
            ]),
            ..message()
        };
        assert_eq!(
            message.to_signable_string().unwrap(),
            "example.com wants you to sign in with your Ethereum account:\n\
             0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed\n\
             \n\
             I accept the terms of service\n\
             \n\
             URI: https://example.com/login\n\
             Version: 1\n\
             Chain ID: 1\n\
             Nonce: abcdefgh12\n\
             Issued At: 2024-01-01T00:00:00.000Z\n\
             Expiration Time: 2024-01-02T00:00:00.000Z\n\
             Not Before: 2024-01-01T12:00:00.000Z\n\
             Request ID: request-7\n\
             Resources:\n\
             - ipfs://bafybeiemxf5abjwjbikoz4mc3a3dla6ual3jsgpdr4cjr3oz3evfyavhwq\n\
             - https://example.com/my-web2-claim.json"
        );
    }

    #[test]
    fn renders_empty_resource_list_header() {
        let mut message = Message {
            resources: Some(vec![]),
            ..message()
        };
        assert!(
            message
                .to_signable_string()
                .unwrap()
                .ends_with("Issued At: 2024-01-01T00:00:00.000Z\nResources:")
        );
    }

    #[test]
    fn backfills_issued_at_once() {
        let mut message = Message {
            issued_at: None,
            ..message()
        };
        let first = message.to_signable_string().unwrap();
        let issued_at = message.issued_at.clone().unwrap();
        assert!(first.contains(&format!("Issued At: {issued_at}")));

        // Repeated rendering keeps the backfilled value and is idempotent.
        assert_eq!(message.to_signable_string().unwrap(), first);
        assert_eq!(message.issued_at, Some(issued_at));
    }

    #[test]
    fn rendering_does_not_repair_invalid_data() {
        let mut message = Message {
            nonce: "bad".to_owned(),
            ..message()
        };
        assert!(message.to_signable_string().is_err());
        assert_eq!(message.nonce, "bad");
    }

    #[test]
    fn timestamp_has_millisecond_precision() {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(timestamp(time), "2024-01-01T00:00:00.000Z");
    }
}
