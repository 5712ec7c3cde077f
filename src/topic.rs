//! Topic Parser.
//!
//! Translates protocol topics of the form
//! `channels/<channel_id>/messages[/<subtopic>...]` into a channel id and a
//! dot-separated subtopic. An optional leading `/` and a trailing `?query`
//! are accepted and ignored.

use crate::core::errors::GatewayError;
use percent_encoding::percent_decode_str;

const CHANNELS_PREFIX: &str = "channels/";
const MESSAGES_SEGMENT: &str = "messages";

/// Characters reserved as subscription wildcards by the bus and the protocol
pub const WILDCARDS: [char; 4] = ['*', '+', '#', '>'];

/// Channel id and the still-encoded subtopic trailer of a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicParts<'a> {
    pub channel: &'a str,
    /// Everything after `messages/`, empty if there is no trailer
    pub raw_subtopic: &'a str,
}

/// Parse a topic into `(channel_id, subtopic)`
///
/// Every violation, subtopic problems included, is reported as
/// `GatewayError::MalformedTopic`.
pub fn parse(topic: &str) -> Result<(String, String), GatewayError> {
    let parts = split(topic)?;
    let subtopic = parse_subtopic(parts.raw_subtopic).map_err(|_| GatewayError::MalformedTopic)?;
    Ok((parts.channel.to_string(), subtopic))
}

/// Validate the channel part of a topic and return the raw subtopic trailer
pub fn split(topic: &str) -> Result<TopicParts<'_>, GatewayError> {
    let path = topic.split_once('?').map_or(topic, |(path, _)| path);
    let path = path.strip_prefix('/').unwrap_or(path);

    let rest = path
        .strip_prefix(CHANNELS_PREFIX)
        .ok_or(GatewayError::MalformedTopic)?;
    let (channel, rest) = rest.split_once('/').ok_or(GatewayError::MalformedTopic)?;

    if !is_valid_channel_id(channel) {
        return Err(GatewayError::MalformedTopic);
    }

    let raw_subtopic = match rest.strip_prefix(MESSAGES_SEGMENT) {
        Some("") => "",
        Some(trailer) => trailer
            .strip_prefix('/')
            .ok_or(GatewayError::MalformedTopic)?,
        None => return Err(GatewayError::MalformedTopic),
    };

    Ok(TopicParts {
        channel,
        raw_subtopic,
    })
}

/// Normalize a raw subtopic trailer (`a/b%20c/d`) into `a.b c.d`
///
/// Fails with `GatewayError::MalformedSubtopic` on invalid percent-encoding,
/// empty segments or wildcard characters. A single trailing `/` is trimmed.
pub fn parse_subtopic(raw: &str) -> Result<String, GatewayError> {
    let trimmed = raw.strip_suffix('/').unwrap_or(raw);
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    let decoded = decode_strict(trimmed).ok_or(GatewayError::MalformedSubtopic)?;

    let mut segments = Vec::new();
    for segment in decoded.split(['/', '.']) {
        if segment.is_empty() || segment.contains(WILDCARDS) {
            return Err(GatewayError::MalformedSubtopic);
        }
        segments.push(segment);
    }

    Ok(segments.join("."))
}

/// Channel ids are non-empty runs of ASCII alphanumerics, `_` and `-`
fn is_valid_channel_id(channel: &str) -> bool {
    !channel.is_empty()
        && channel
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Percent-decode, rejecting dangling `%` escapes and non UTF-8 output
fn decode_strict(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
            if !valid {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(input)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}
