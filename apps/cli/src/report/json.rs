use anyhow::Result;
use nodecheck::AssessmentResult;

use super::Renderer;

/// Serialised [`AssessmentResult`], pretty-printed
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, result: &AssessmentResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodecheck::{NodeCheckResult, NodeKind, assess};
    use serde_json::Value;

    #[test]
    fn test_json_fields() {
        let result = assess(
            NodeCheckResult::new(NodeKind::Consensus, "localhost:5052"),
            NodeCheckResult::new(NodeKind::Execution, "localhost:8545"),
        );
        let json: Value = serde_json::from_str(&JsonRenderer.render(&result).unwrap()).unwrap();

        assert_eq!(json["tier"], "NOT_READY");
        assert_eq!(json["ready"], false);
        assert_eq!(json["overall_score"], 0.0);
        assert_eq!(json["consensus"]["kind"], "consensus");
        assert_eq!(json["execution"]["endpoint"], "localhost:8545");
        assert!(json.get("resources").is_none());
    }
}
