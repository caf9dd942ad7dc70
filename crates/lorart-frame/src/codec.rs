use tracing::trace;

use crate::error::Result;

/// Default LoRaWAN application port for uplinks.
pub const DEFAULT_FPORT: u8 = 2;

/// One outbound application payload, ready to serialize as an
/// `AT+SENDB` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UplinkCommand {
    pub confirmed: bool,
    pub fport: u8,
    payload: Vec<u8>,
}

impl UplinkCommand {
    /// Build an unconfirmed uplink on the default port from a JSON value.
    ///
    /// The payload on the wire is the UTF-8 bytes of the compact JSON
    /// encoding.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Ok(Self {
            confirmed: false,
            fport: DEFAULT_FPORT,
            payload: serde_json::to_vec(value)?,
        })
    }

    pub fn from_bytes(payload: Vec<u8>) -> Self {
        Self {
            confirmed: false,
            fport: DEFAULT_FPORT,
            payload,
        }
    }

    pub fn confirmed(mut self, confirmed: bool) -> Self {
        self.confirmed = confirmed;
        self
    }

    pub fn fport(mut self, fport: u8) -> Self {
        self.fport = fport;
        self
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Render the `AT+SENDB=<confirm>,<port>,<len>,<hex>` command line.
    pub fn to_line(&self) -> String {
        format!(
            "AT+SENDB={},{},{},{}",
            u8::from(self.confirmed),
            self.fport,
            self.payload.len(),
            hex::encode(&self.payload),
        )
    }
}

/// One inbound application payload, parsed from a module line but not yet
/// decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownlinkFrame {
    pub fport: u8,
    pub hex_payload: String,
}

impl DownlinkFrame {
    /// Recognize a downlink line, in either shape the module emits:
    /// bare `<port>:<hex>`, or `+RECV:<f1>,<f2>,<hex>` with the port in
    /// the first field. Returns `None` for anything else.
    pub fn parse(line: &str) -> Option<Self> {
        if let Some(frame) = Self::parse_bare(line) {
            trace!(fport = frame.fport, "downlink line (bare form)");
            return Some(frame);
        }
        if let Some(frame) = Self::parse_recv(line) {
            trace!(fport = frame.fport, "downlink line (+RECV form)");
            return Some(frame);
        }
        None
    }

    fn parse_bare(line: &str) -> Option<Self> {
        let (port, hex_payload) = line.split_once(':')?;
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if hex_payload.is_empty() || !hex_payload.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self {
            fport: port.parse().ok()?,
            hex_payload: hex_payload.to_string(),
        })
    }

    fn parse_recv(line: &str) -> Option<Self> {
        let rest = line.strip_prefix("+RECV:")?;
        let mut fields = rest.split(',');
        let port = fields.next()?.trim();
        let _meta = fields.next()?;
        let hex_payload = fields.next()?.trim();
        if hex_payload.is_empty() || !hex_payload.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self {
            fport: port.parse().ok()?,
            hex_payload: hex_payload.to_string(),
        })
    }

    /// Decode the hex payload as a UTF-8 JSON document.
    pub fn decode_json(&self) -> Result<serde_json::Value> {
        let bytes = hex::decode(&self.hex_payload)?;
        let text = String::from_utf8(bytes)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::CodecError;

    #[test]
    fn uplink_encodes_json_as_lowercase_hex() {
        let command = UplinkCommand::from_json(&json!({"x": 1})).unwrap();
        assert_eq!(command.to_line(), "AT+SENDB=0,2,7,7b2278223a317d");
    }

    #[test]
    fn uplink_honours_confirm_and_port() {
        let command = UplinkCommand::from_bytes(vec![0xAB, 0xCD])
            .confirmed(true)
            .fport(10);
        assert_eq!(command.to_line(), "AT+SENDB=1,10,2,abcd");
    }

    #[test]
    fn bare_downlink_round_trips() {
        let frame = DownlinkFrame::parse("2:7b2278223a317d").unwrap();
        assert_eq!(frame.fport, 2);
        assert_eq!(frame.decode_json().unwrap(), json!({"x": 1}));
    }

    #[test]
    fn recv_downlink_takes_hex_from_third_field() {
        let frame = DownlinkFrame::parse("+RECV:2,14,7b2278223a317d").unwrap();
        assert_eq!(frame.fport, 2);
        assert_eq!(frame.hex_payload, "7b2278223a317d");
    }

    #[test]
    fn non_downlink_lines_are_rejected() {
        for line in ["+JOIN: OK", "AT_ERROR", "rxDone", "2:", ":abcd", "x:abcd"] {
            assert_eq!(DownlinkFrame::parse(line), None, "line {line:?}");
        }
    }

    #[test]
    fn invalid_hex_is_not_a_downlink() {
        assert_eq!(DownlinkFrame::parse("2:zz"), None);
    }

    #[test]
    fn decode_surfaces_bad_utf8_and_bad_json() {
        let frame = DownlinkFrame {
            fport: 2,
            hex_payload: "ff".to_string(),
        };
        assert!(matches!(frame.decode_json(), Err(CodecError::Utf8(_))));

        let frame = DownlinkFrame {
            fport: 2,
            // "{x" in hex
            hex_payload: "7b78".to_string(),
        };
        assert!(matches!(frame.decode_json(), Err(CodecError::Json(_))));
    }
}
