use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewFile {
    pub uuid: String,
    pub product_id: Option<String>,
    pub seq: Option<i32>,
    pub name: String,
    pub name_origin: String,
    pub file_type: String,
    pub mime_type: String,
    #[serde(default)]
    pub file_size_kb: f64,
    #[serde(default)]
    pub file_size_mb: f64,
    #[serde(default)]
    pub file_size_gb: f64,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub review_id: String,
    pub product_id: String,
    pub product_name: String,
    pub product_item_id: String,
    pub product_item_name: String,
    pub product_item_quantity_id: Option<String>,
    pub product_item_quantity_name: Option<String>,
    pub product_quantity_id: Option<String>,
    pub product_quantity_name: Option<String>,
    pub review_by: String,
    #[serde(default)]
    pub review_quality: String,
    #[serde(default)]
    pub review_value: String,
    #[serde(default)]
    pub review_desc: String,
    pub review_rating: f64,
    pub review_date: String,
    #[serde(default)]
    pub review_time: String,
    #[serde(default)]
    pub file_list: Vec<ReviewFile>,
}

/// Rating breakdown for a product page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub average_rating: f64,
    pub total_reviews: usize,
    /// Count of reviews per star rating, index 0 = one star.
    pub distribution: [usize; 5],
}

impl ReviewSummary {
    /// Ratings outside 1..=5 are clamped into range. Fractional ratings
    /// count towards the nearest star in the distribution.
    pub fn from_reviews(reviews: &[Review]) -> Self {
        if reviews.is_empty() {
            return Self::default();
        }
        let mut distribution = [0usize; 5];
        let mut sum = 0.0;
        for review in reviews {
            let rating = if review.review_rating.is_finite() {
                review.review_rating.clamp(1.0, 5.0)
            } else {
                1.0
            };
            distribution[rating.round() as usize - 1] += 1;
            sum += rating;
        }
        Self {
            average_rating: sum / reviews.len() as f64,
            total_reviews: reviews.len(),
            distribution,
        }
    }

    pub fn count_for(&self, stars: u8) -> usize {
        match stars {
            1..=5 => self.distribution[usize::from(stars - 1)],
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: f64) -> Review {
        Review {
            review_id: format!("r{}", rating),
            product_id: "P1".into(),
            product_name: "Food".into(),
            product_item_id: "I1".into(),
            product_item_name: "Tuna".into(),
            product_item_quantity_id: None,
            product_item_quantity_name: None,
            product_quantity_id: None,
            product_quantity_name: None,
            review_by: "somsri".into(),
            review_quality: String::new(),
            review_value: String::new(),
            review_desc: "ดีมาก".into(),
            review_rating: rating,
            review_date: "2025-03-01".into(),
            review_time: "10:00".into(),
            file_list: vec![],
        }
    }

    #[test]
    fn test_summary_average_and_distribution() {
        let summary = ReviewSummary::from_reviews(&[review(5.0), review(4.0), review(5.0), review(0.0)]);
        assert_eq!(summary.total_reviews, 4);
        assert_eq!(summary.count_for(5), 2);
        assert_eq!(summary.count_for(1), 1); // 0 clamps to 1
        assert_eq!(summary.average_rating, 15.0 / 4.0);
    }

    #[test]
    fn test_fractional_rating() {
        let json = r#"{"review_id":"r1","product_id":"P1","product_name":"Food",
            "product_item_id":"I1","product_item_name":"Tuna","review_by":"somsri",
            "review_rating":4.5,"review_date":"2025-03-01"}"#;
        let parsed: Review = serde_json::from_str(json).expect("fractional rating");
        assert_eq!(parsed.review_rating, 4.5);

        let summary = ReviewSummary::from_reviews(&[parsed, review(3.4)]);
        assert_eq!(summary.count_for(5), 1);
        assert_eq!(summary.count_for(3), 1);
        assert!((summary.average_rating - 3.95).abs() < 1e-9);
    }

    #[test]
    fn test_summary_empty() {
        let summary = ReviewSummary::from_reviews(&[]);
        assert_eq!(summary.total_reviews, 0);
        assert_eq!(summary.average_rating, 0.0);
        assert_eq!(summary.count_for(9), 0);
    }
}
