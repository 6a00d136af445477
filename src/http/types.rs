use crate::domain::{CategoryCount, HistogramPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query-string parameters shared by the aggregate endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    pub period: Option<String>,
    pub bag_type: Option<String>,
    pub group_interval: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistogramPointBody {
    pub timestamp: DateTime<Utc>,
    pub count: u64,
    pub bag_type: String,
}

impl From<HistogramPoint> for HistogramPointBody {
    fn from(point: HistogramPoint) -> Self {
        Self {
            timestamp: point.timestamp,
            count: point.count,
            bag_type: point.category,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCountBody {
    pub bag_type: String,
    pub count: u64,
}

impl From<CategoryCount> for CategoryCountBody {
    fn from(pair: CategoryCount) -> Self {
        Self {
            bag_type: pair.category,
            count: pair.count,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DailyTotalBody {
    pub total: u64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AverageBody {
    pub average: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ProductionTimeBody {
    pub duration: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_count_body_uses_bag_type_key() {
        let body = CategoryCountBody::from(CategoryCount {
            category: "glass".to_string(),
            count: 3,
        });
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["bagType"], "glass");
        assert_eq!(json["count"], 3);
    }

    #[test]
    fn test_histogram_point_body_keys() {
        let body = HistogramPointBody::from(HistogramPoint {
            timestamp: Utc::now(),
            count: 2,
            category: "plastic".to_string(),
        });
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("bagType").is_some());
        assert!(json.get("timestamp").is_some());
    }
}
