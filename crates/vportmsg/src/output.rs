use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use vportmsg_frame::{MessageKind, WireCode};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One frame read from a port, ready for printing.
pub struct Received<'a> {
    pub sequence: usize,
    pub code: Option<WireCode>,
    pub body: &'a [u8],
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    sequence: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

pub fn print_frame(frame: &Received<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                sequence: frame.sequence,
                code: frame.code.map(WireCode::code),
                kind: frame.code.map(WireCode::name),
                payload_size: frame.body.len(),
                payload: payload_preview(frame.body),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "KIND", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    frame.sequence.to_string(),
                    code_label(frame.code),
                    frame.body.len().to_string(),
                    payload_preview(frame.body),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "seq={} kind={} size={} payload={}",
                frame.sequence,
                code_label(frame.code),
                frame.body.len(),
                payload_preview(frame.body)
            );
        }
        OutputFormat::Raw => {
            print_raw(frame.body);
        }
    }
}

#[derive(Serialize)]
struct KindOutput {
    code: u32,
    name: &'static str,
    deprecated: bool,
}

pub fn print_kinds(format: OutputFormat) {
    let kinds: Vec<KindOutput> = MessageKind::ALL
        .iter()
        .map(|kind| KindOutput {
            code: kind.code(),
            name: kind.name(),
            deprecated: kind.is_deprecated(),
        })
        .collect();

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&kinds).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CODE", "NAME", "DEPRECATED"]);
            for kind in &kinds {
                table.add_row(vec![
                    kind.code.to_string(),
                    kind.name.to_string(),
                    if kind.deprecated { "yes" } else { "" }.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for kind in &kinds {
                let marker = if kind.deprecated { " (deprecated)" } else { "" };
                println!("{:>2} {}{marker}", kind.code, kind.name);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn code_label(code: Option<WireCode>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "-".to_string(),
    }
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.trim_end_matches('\0').to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_strips_trailing_nuls() {
        assert_eq!(payload_preview(b"guest-01\0\0"), "guest-01");
        assert_eq!(payload_preview(&[0xFF, 0xFE]), "<binary 2 bytes>");
    }

    #[test]
    fn frame_json_omits_absent_code() {
        let out = FrameOutput {
            sequence: 0,
            code: None,
            kind: None,
            payload_size: 2,
            payload: "hi".to_string(),
            timestamp: "0".to_string(),
        };
        let json = serde_json::to_string(&out).expect("frame output should serialize");
        assert!(!json.contains("\"code\""));
        assert!(json.contains("\"payload\":\"hi\""));
    }

    #[test]
    fn code_label_names_known_and_unknown() {
        assert_eq!(
            code_label(Some(WireCode::Known(MessageKind::SessionLock))),
            "session-lock (12)"
        );
        assert_eq!(code_label(Some(WireCode::Unknown(99))), "unknown (99)");
        assert_eq!(code_label(None), "-");
    }
}
