//! Remediation plan for detected fraud types

use crate::types::report::{ActionItem, FraudType, Priority, Recommendations};

/// Maps fraud labels onto a fixed baseline plan plus per-type actions.
///
/// Pure: the same labels always produce the same plan.
pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn recommend(&self, fraud_types: &[FraudType]) -> Recommendations {
        let mut plan = baseline();

        if fraud_types.contains(&FraudType::MoneyLaundering) {
            plan.immediate.push(ActionItem::new(
                "Regulatory Reporting",
                "File SAR (Suspicious Activity Report) with FinCEN",
                "48 hours",
                Priority::Critical,
                "Compliance Officer",
            ));
        }

        if fraud_types.contains(&FraudType::Embezzlement) {
            plan.investigation.push(ActionItem::new(
                "Internal Investigation",
                "Review employee access and authorization logs",
                "48 hours",
                Priority::High,
                "HR Department",
            ));
        }

        plan
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn baseline() -> Recommendations {
    Recommendations {
        immediate: vec![ActionItem::new(
            "Account Freeze",
            "Temporarily freeze all suspicious accounts",
            "24 hours",
            Priority::Critical,
            "Security Team",
        )],
        investigation: vec![ActionItem::new(
            "Forensic Audit",
            "Conduct detailed transaction analysis for last 90 days",
            "72 hours",
            Priority::High,
            "Audit Department",
        )],
        prevention: vec![ActionItem::new(
            "System Upgrade",
            "Implement real-time monitoring system",
            "30 days",
            Priority::Medium,
            "IT Department",
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(actions: &[ActionItem]) -> Vec<&str> {
        actions.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn test_baseline_always_present() {
        let engine = RecommendationEngine::new();
        for types in [
            vec![FraudType::NoSuspiciousActivityDetected],
            vec![FraudType::SuspiciousActivity],
            vec![FraudType::MoneyLaundering, FraudType::Embezzlement],
            vec![],
        ] {
            let plan = engine.recommend(&types);
            assert_eq!(plan.immediate[0].title, "Account Freeze");
            assert_eq!(plan.investigation[0].title, "Forensic Audit");
            assert_eq!(plan.prevention[0].title, "System Upgrade");
        }
    }

    #[test]
    fn test_baseline_only_for_generic_activity() {
        let plan = RecommendationEngine::new().recommend(&[FraudType::SuspiciousActivity]);
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_money_laundering_adds_regulatory_reporting() {
        let plan = RecommendationEngine::new().recommend(&[FraudType::MoneyLaundering]);
        assert_eq!(titles(&plan.immediate), vec!["Account Freeze", "Regulatory Reporting"]);
        assert_eq!(plan.immediate[1].responsible, "Compliance Officer");
        assert_eq!(plan.investigation.len(), 1);
    }

    #[test]
    fn test_embezzlement_adds_internal_investigation() {
        let plan = RecommendationEngine::new().recommend(&[FraudType::Embezzlement]);
        assert_eq!(
            titles(&plan.investigation),
            vec!["Forensic Audit", "Internal Investigation"]
        );
        assert_eq!(plan.investigation[1].priority, Priority::High);
        assert_eq!(plan.immediate.len(), 1);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let engine = RecommendationEngine::new();
        let types = [FraudType::MoneyLaundering, FraudType::Embezzlement];
        assert_eq!(engine.recommend(&types), engine.recommend(&types));
        assert_eq!(engine.recommend(&types).iter().count(), 5);
    }
}
