use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use lorart_bridge::SpotCodeMap;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

#[derive(Serialize)]
struct DownlinkOutput<'a> {
    fport: u8,
    payload: &'a serde_json::Value,
    timestamp: String,
}

pub fn print_downlink(fport: u8, payload: &serde_json::Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = DownlinkOutput {
                fport,
                payload,
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
                .set_header(vec!["FPORT", "PAYLOAD"])
                .add_row(vec![fport.to_string(), payload.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("fport={fport} payload={payload}");
        }
    }
}

pub fn print_spots(map: &SpotCodeMap, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = map
                .iter()
                .map(|(code, id)| serde_json::json!({ "code": code, "spot_id": id }))
                .collect();
            println!(
                "{}",
                serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CODE", "SPOT"]);
            for (code, id) in map.iter() {
                table.add_row(vec![code.to_string(), id.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (code, id) in map.iter() {
                println!("{code:>3} {id}");
            }
        }
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
