use adkit_core::{Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use serde_json::{Map, Value, json};

/// Offsets outside this range are not real time zones.
const MAX_OFFSET_HOURS: f64 = 14.0;

pub struct CurrentTimeTool;

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Returns the current date and time. Pass utc_offset_hours to get local time for a fixed offset, e.g. -5 or 5.5."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "utc_offset_hours": {
                    "type": "number",
                    "description": "Hours east of UTC. Defaults to 0."
                }
            }
        })
    }

    async fn execute(
        &self,
        arguments: Map<String, Value>,
        _ctx: &mut ToolContext,
    ) -> anyhow::Result<ToolResult> {
        let hours = match arguments.get("utc_offset_hours") {
            None | Some(Value::Null) => 0.0,
            Some(v) => match v.as_f64() {
                Some(h) => h,
                None => return Ok(ToolResult::error("utc_offset_hours must be a number")),
            },
        };
        if !(-MAX_OFFSET_HOURS..=MAX_OFFSET_HOURS).contains(&hours) {
            return Ok(ToolResult::error(format!(
                "utc_offset_hours must be between -{MAX_OFFSET_HOURS} and {MAX_OFFSET_HOURS}"
            )));
        }

        let seconds = (hours * 3600.0).round() as i32;
        let Some(offset) = FixedOffset::east_opt(seconds) else {
            return Ok(ToolResult::error(format!("invalid UTC offset: {hours}")));
        };
        let now = Utc::now().with_timezone(&offset);

        Ok(ToolResult::success(Map::new())
            .with("iso8601", now.to_rfc3339())
            .with("date", now.format("%Y-%m-%d").to_string())
            .with("time", now.format("%H:%M:%S").to_string())
            .with("utc_offset", offset.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adkit_core::State;

    fn ctx() -> ToolContext {
        ToolContext::new("inv", "agent", State::default())
    }

    #[tokio::test]
    async fn defaults_to_utc() {
        let result = CurrentTimeTool.execute(Map::new(), &mut ctx()).await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.get("utc_offset"), Some(&json!("+00:00")));
    }

    #[tokio::test]
    async fn applies_fractional_offset() {
        let mut args = Map::new();
        args.insert("utc_offset_hours".into(), json!(5.5));
        let result = CurrentTimeTool.execute(args, &mut ctx()).await.unwrap();
        assert_eq!(result.get("utc_offset"), Some(&json!("+05:30")));
        assert!(result.get("iso8601").unwrap().as_str().unwrap().ends_with("+05:30"));
    }

    #[tokio::test]
    async fn rejects_out_of_range_offset() {
        let mut args = Map::new();
        args.insert("utc_offset_hours".into(), json!(20));
        let result = CurrentTimeTool.execute(args, &mut ctx()).await.unwrap();
        assert!(!result.is_success());
    }
}
