//! Extraction of the JSON payload from an event-stream response body.
//!
//! The server answers a single request per body, so only the first `data:` frame matters.
//! Everything after its marker, plus every following line verbatim, is treated as the
//! payload. Later `data:` prefixes are not stripped.

const DATA_PREFIX: &str = "data:";

#[derive(Debug)]
enum FrameState {
    SeekingData,
    AccumulatingRest(String),
}

/// Returns the payload text of the first data frame, or `None` when the body has no
/// `data:` line at all.
pub fn first_data_payload(body: &str) -> Option<String> {
    let mut state = FrameState::SeekingData;

    for line in body.split('\n') {
        state = match state {
            FrameState::SeekingData => match line.strip_prefix(DATA_PREFIX) {
                Some(rest) => FrameState::AccumulatingRest(rest.to_string()),
                None => FrameState::SeekingData,
            },
            FrameState::AccumulatingRest(mut payload) => {
                payload.push('\n');
                payload.push_str(line);
                FrameState::AccumulatingRest(payload)
            }
        };
    }

    match state {
        FrameState::SeekingData => None,
        FrameState::AccumulatingRest(payload) => Some(payload.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let body = "event: message\ndata: {\"result\":{\"content\":[]}}\n\n";
        assert_eq!(
            first_data_payload(body).as_deref(),
            Some("{\"result\":{\"content\":[]}}")
        );
    }

    #[test]
    fn test_no_space_after_marker() {
        let body = "data:{\"a\":1}";
        assert_eq!(first_data_payload(body).as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_continuation_lines_are_kept_raw() {
        let body = "id: 1\ndata: {\"result\":\n  {\"content\": []}}\n\n";
        let payload = first_data_payload(body).unwrap();
        assert_eq!(payload, "{\"result\":\n  {\"content\": []}}");
        assert!(serde_json::from_str::<serde_json::Value>(&payload).is_ok());
    }

    #[test]
    fn test_second_data_prefix_not_stripped() {
        let body = "data: {\"a\":\ndata: 1}";
        assert_eq!(
            first_data_payload(body).as_deref(),
            Some("{\"a\":\ndata: 1}")
        );
    }

    #[test]
    fn test_colons_in_payload_survive() {
        let body = "data: {\"nodeId\":\"1:2\"}\n";
        assert_eq!(
            first_data_payload(body).as_deref(),
            Some("{\"nodeId\":\"1:2\"}")
        );
    }

    #[test]
    fn test_no_data_line() {
        assert_eq!(first_data_payload("event: ping\n\n"), None);
        assert_eq!(first_data_payload(""), None);
    }
}
