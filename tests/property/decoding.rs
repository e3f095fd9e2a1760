//! Property tests for response decoding.
//!
//! 1. Arbitrary bytes with any status never panic in `decode_response`.
//! 2. Every non-2xx status decodes to an error classified from the status.
//! 3. A non-blank server message is carried through verbatim.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use taskdesk_proto::api::{MessageResponse, ResultEnvelope};
use taskdesk_proto::codec::{ApiErrorKind, decode_response};
use taskdesk_proto::task::Task;

fn error_status() -> impl Strategy<Value = u16> {
    prop_oneof![400_u16..600, 100_u16..200, 300_u16..400]
        .prop_filter("non-2xx", |s| !(200..300).contains(s))
}

proptest! {
    #[test]
    fn random_bytes_never_panic(status in 100_u16..600, body in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode_response::<MessageResponse>(status, &body);
        let _ = decode_response::<ResultEnvelope<Vec<Task>>>(status, &body);
    }

    #[test]
    fn error_status_is_never_success(status in error_status(), body in prop::collection::vec(any::<u8>(), 0..128)) {
        let err = decode_response::<MessageResponse>(status, &body).unwrap_err();
        prop_assert_eq!(err.status, Some(status));
        prop_assert!(!err.message.is_empty());
        let expected = ApiErrorKind::from_status(status).unwrap_or(ApiErrorKind::Decode);
        prop_assert_eq!(err.kind, expected);
    }

    #[test]
    fn unauthorized_statuses_are_token_rejections(status in prop::sample::select(vec![401_u16, 403])) {
        let err = decode_response::<MessageResponse>(status, b"").unwrap_err();
        prop_assert!(err.is_unauthorized());
    }

    #[test]
    fn server_message_survives(status in 400_u16..600, message in "[A-Za-z][A-Za-z !.]{0,40}") {
        let body = serde_json::json!({ "message": message }).to_string();
        let err = decode_response::<MessageResponse>(status, body.as_bytes()).unwrap_err();
        prop_assert_eq!(err.server_message(), Some(message.as_str()));
    }

    #[test]
    fn success_with_garbage_is_decode_error(status in 200_u16..300, junk in "[^{\\[\"0-9tfn ]{1,32}") {
        let err = decode_response::<MessageResponse>(status, junk.as_bytes()).unwrap_err();
        prop_assert_eq!(err.kind, ApiErrorKind::Decode);
    }
}
