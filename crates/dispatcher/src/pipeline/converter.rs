//! Payload converters

use contracts::{org_channel, ChannelFrame, ChannelId, ContractError, ConverterKind, Frame};

/// Convert a raw payload with `kind`
///
/// `json_auto` frames target the output's channel (empty `channel`);
/// `json_frame` payloads may name their own target.
pub fn convert(
    kind: ConverterKind,
    channel: &ChannelId,
    data: &[u8],
) -> Result<Vec<ChannelFrame>, ContractError> {
    let frame = match kind {
        ConverterKind::JsonAuto => ChannelFrame {
            channel: String::new(),
            frame: json_auto(channel, data)?,
        },
        ConverterKind::JsonFrame => json_frame(channel, data)?,
    };

    Ok(vec![frame])
}

/// JSON object -> one frame named after the channel
fn json_auto(channel: &ChannelId, data: &[u8]) -> Result<Frame, ContractError> {
    let value: serde_json::Value = serde_json::from_slice(data)
        .map_err(|e| ContractError::conversion(channel.as_str(), format!("invalid JSON: {e}")))?;

    match value {
        serde_json::Value::Object(map) => Ok(Frame {
            name: channel.to_string(),
            fields: map.into_iter().collect(),
        }),
        other => Err(ContractError::conversion(
            channel.as_str(),
            format!("expected a JSON object, got {}", json_kind(&other)),
        )),
    }
}

/// Serialized `Frame`, optionally with a `"channel"` target inside the org
fn json_frame(channel: &ChannelId, data: &[u8]) -> Result<ChannelFrame, ContractError> {
    let invalid =
        |e: serde_json::Error| ContractError::conversion(channel.as_str(), format!("invalid frame: {e}"));

    let mut value: serde_json::Value = serde_json::from_slice(data).map_err(invalid)?;
    let target = match value.as_object_mut().and_then(|map| map.remove("channel")) {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(target)) => {
            org_channel::check_path(&target).map_err(|e| {
                ContractError::conversion(channel.as_str(), format!("invalid frame channel: {e}"))
            })?;
            target
        }
        Some(other) => {
            return Err(ContractError::conversion(
                channel.as_str(),
                format!("frame channel must be a string, got {}", json_kind(&other)),
            ))
        }
    };

    let frame = serde_json::from_value(value).map_err(invalid)?;
    Ok(ChannelFrame {
        channel: target,
        frame,
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
