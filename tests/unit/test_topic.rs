// Property tests for the topic parser

use mqtt_gateway::core::errors::GatewayError;
use mqtt_gateway::topic::{parse, parse_subtopic, split};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use proptest::prelude::*;

proptest! {
    #[test]
    fn valid_topics_parse(
        channel in "[A-Za-z0-9_-]{1,24}",
        segments in prop::collection::vec("[a-zA-Z0-9_-]{1,8}", 0..5),
    ) {
        let mut topic = format!("channels/{}/messages", channel);
        for segment in &segments {
            topic.push('/');
            topic.push_str(segment);
        }

        let (parsed_channel, subtopic) = parse(&topic).unwrap();
        prop_assert_eq!(parsed_channel, channel);
        prop_assert_eq!(subtopic, segments.join("."));
    }

    #[test]
    fn wildcard_channels_are_rejected(
        prefix in "[a-z0-9]{0,4}",
        wildcard in prop::sample::select(vec!['*', '+', '#', '>']),
        suffix in "[a-z0-9]{0,4}",
    ) {
        let topic = format!("channels/{}{}{}/messages", prefix, wildcard, suffix);
        prop_assert_eq!(parse(&topic), Err(GatewayError::MalformedTopic));
    }

    #[test]
    fn arbitrary_input_never_panics(topic in ".*") {
        match parse(&topic) {
            Ok(_) => prop_assert!(split(&topic).is_ok()),
            Err(e) => prop_assert_eq!(e, GatewayError::MalformedTopic),
        }
    }

    #[test]
    fn percent_encoded_segments_decode(segment in "[a-zA-Z0-9 äöé_~-]{1,12}") {
        let encoded = utf8_percent_encode(&segment, NON_ALPHANUMERIC).to_string();
        prop_assert_eq!(parse_subtopic(&encoded).unwrap(), segment);
    }
}

#[test]
fn test_subtopic_and_topic_errors_are_distinct() {
    let parts = split("channels/ch1/messages/bad>").unwrap();
    assert_eq!(parts.channel, "ch1");
    assert_eq!(
        parse_subtopic(parts.raw_subtopic),
        Err(GatewayError::MalformedSubtopic)
    );
    assert_eq!(split("channels/**/messages/ok"), Err(GatewayError::MalformedTopic));
}

#[test]
fn test_empty_segments_are_malformed() {
    assert_eq!(parse_subtopic("a//b"), Err(GatewayError::MalformedSubtopic));
    assert_eq!(parse_subtopic("a/./b"), Err(GatewayError::MalformedSubtopic));
    assert_eq!(parse_subtopic("a//"), Err(GatewayError::MalformedSubtopic));
}
