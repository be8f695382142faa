//! Parsers for per-lottery draw-info endpoints.
//!
//! Each provider wraps the draw in its own JSON envelope. Parsers are
//! registered by lottery code and all produce an [`ApiDraw`].

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{DrawError, Result};
use crate::lenient::{opt_string_from_any, string_from_any};

/// Which draw the endpoint described.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPosition {
    /// The upcoming draw.
    Upcoming,
    /// The most recently held draw; the caller advances it.
    Last,
}

/// Canonical result of an envelope parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiDraw {
    pub period: String,
    pub draw_date: NaiveDate,
    pub position: DrawPosition,
}

pub type EnvelopeParser = fn(&[u8]) -> Result<ApiDraw>;

static PARSERS: &[(&str, EnvelopeParser)] = &[("fc_ssq", parse_flat), ("tc_dlt", parse_nested)];

/// Parser registered for a lottery code.
pub fn parser_for(code: &str) -> Option<EnvelopeParser> {
    PARSERS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, parser)| *parser)
}

// ---------------------------------------------------------------------------
// {code, message, data: {drawDate, drawNumber}}
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct FlatEnvelope {
    #[serde(deserialize_with = "string_from_any")]
    code: String,
    #[serde(default)]
    message: Option<String>,
    data: Option<FlatData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FlatData {
    draw_date: String,
    #[serde(deserialize_with = "string_from_any")]
    draw_number: String,
}

pub fn parse_flat(body: &[u8]) -> Result<ApiDraw> {
    let env: FlatEnvelope =
        serde_json::from_slice(body).map_err(|e| DrawError::Parse(e.to_string()))?;
    if env.code.trim() != "0" {
        return Err(DrawError::Provider {
            code: env.code,
            message: env.message.unwrap_or_default(),
        });
    }
    let data = env
        .data
        .ok_or_else(|| DrawError::Parse("missing data".to_string()))?;
    Ok(ApiDraw {
        period: non_empty_period(data.draw_number)?,
        draw_date: parse_date(&data.draw_date)?,
        position: DrawPosition::Upcoming,
    })
}

// ---------------------------------------------------------------------------
// {success, errorCode, value: {lastPoolDraw: {lotteryDrawNum, lotteryDrawTime}}}
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NestedEnvelope {
    success: bool,
    #[serde(default, deserialize_with = "opt_string_from_any")]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    value: Option<NestedValue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NestedValue {
    last_pool_draw: Option<PoolDraw>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PoolDraw {
    #[serde(deserialize_with = "string_from_any")]
    lottery_draw_num: String,
    lottery_draw_time: String,
}

pub fn parse_nested(body: &[u8]) -> Result<ApiDraw> {
    let env: NestedEnvelope =
        serde_json::from_slice(body).map_err(|e| DrawError::Parse(e.to_string()))?;
    let code_ok = env.error_code.as_deref().map_or(true, |c| c == "0");
    if !env.success || !code_ok {
        return Err(DrawError::Provider {
            code: env.error_code.unwrap_or_else(|| "false".to_string()),
            message: env.error_message.unwrap_or_default(),
        });
    }
    let draw = env
        .value
        .and_then(|v| v.last_pool_draw)
        .ok_or_else(|| DrawError::Parse("missing lastPoolDraw".to_string()))?;
    Ok(ApiDraw {
        period: non_empty_period(draw.lottery_draw_num)?,
        draw_date: parse_date(&draw.lottery_draw_time)?,
        position: DrawPosition::Last,
    })
}

fn non_empty_period(period: String) -> Result<String> {
    let period = period.trim().to_string();
    if period.is_empty() {
        return Err(DrawError::Parse("empty draw number".to_string()));
    }
    Ok(period)
}

/// Dates may carry a time part (`2024-08-31 21:25:00`); only the first ten
/// characters are used.
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| DrawError::Parse(format!("bad date '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_known_codes() {
        assert!(parser_for("fc_ssq").is_some());
        assert!(parser_for("tc_dlt").is_some());
        assert!(parser_for("other").is_none());
    }

    #[test]
    fn flat_envelope() {
        let body = br#"{"code":0,"message":"ok","data":{"drawDate":"2024-09-01","drawNumber":"2024101"}}"#;
        let draw = parse_flat(body).unwrap();
        assert_eq!(draw.period, "2024101");
        assert_eq!(draw.draw_date, NaiveDate::from_ymd_opt(2024, 9, 1).unwrap());
        assert_eq!(draw.position, DrawPosition::Upcoming);
    }

    #[test]
    fn flat_envelope_provider_failure() {
        let body = br#"{"code":500,"message":"busy"}"#;
        match parse_flat(body) {
            Err(DrawError::Provider { code, message }) => {
                assert_eq!(code, "500");
                assert_eq!(message, "busy");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn nested_envelope() {
        let body = br#"{"success":true,"errorCode":"0","value":{"lastPoolDraw":{"lotteryDrawNum":"24099","lotteryDrawTime":"2024-08-28 21:25:00"}}}"#;
        let draw = parse_nested(body).unwrap();
        assert_eq!(draw.period, "24099");
        assert_eq!(draw.draw_date, NaiveDate::from_ymd_opt(2024, 8, 28).unwrap());
        assert_eq!(draw.position, DrawPosition::Last);

        // errorCode may be omitted
        let body = br#"{"success":true,"value":{"lastPoolDraw":{"lotteryDrawNum":24099,"lotteryDrawTime":"2024-08-28"}}}"#;
        assert_eq!(parse_nested(body).unwrap().period, "24099");
    }

    #[test]
    fn nested_envelope_failures() {
        assert!(matches!(
            parse_nested(br#"{"success":false,"errorCode":"1"}"#),
            Err(DrawError::Provider { .. })
        ));
        assert!(matches!(
            parse_nested(br#"{"success":true,"errorCode":"9","value":null}"#),
            Err(DrawError::Provider { .. })
        ));
        assert!(matches!(
            parse_nested(br#"{"success":true,"value":{}}"#),
            Err(DrawError::Parse(_))
        ));
        assert!(matches!(parse_nested(b"<html>"), Err(DrawError::Parse(_))));
    }
}
