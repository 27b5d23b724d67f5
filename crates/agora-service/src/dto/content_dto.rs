//! Content-related DTOs.

use agora_core::{AuthorId, ContentStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create a listing or post.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateContentRequest {
    pub author_id: AuthorId,

    #[validate(
        length(min = 1, max = 100, message = "Title must be 1-100 characters"),
        custom(function = "agora_core::rules::not_blank", message = "Title cannot be blank")
    )]
    pub title: String,

    #[validate(length(max = 5000, message = "Content cannot exceed 5000 characters"))]
    pub content: String,

    #[validate(custom(function = "agora_core::rules::valid_price", message = "Invalid price"))]
    pub price: Option<f64>,

    pub campus_id: Option<u64>,

    #[validate(length(max = 32))]
    pub goods_type: Option<String>,

    #[validate(length(max = 32))]
    pub tag: Option<String>,

    #[serde(default)]
    #[validate(length(max = 9, message = "At most 9 images"))]
    pub images: Vec<String>,
}

/// Request to change an existing item. Absent fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateContentRequest {
    #[validate(
        length(min = 1, max = 100, message = "Title must be 1-100 characters"),
        custom(function = "agora_core::rules::not_blank", message = "Title cannot be blank")
    )]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Content cannot exceed 5000 characters"))]
    pub content: Option<String>,

    #[validate(custom(function = "agora_core::rules::valid_price", message = "Invalid price"))]
    pub price: Option<f64>,

    #[validate(length(max = 32))]
    pub tag: Option<String>,

    pub status: Option<ContentStatus>,

    #[validate(length(max = 9, message = "At most 9 images"))]
    pub images: Option<Vec<String>>,
}

impl UpdateContentRequest {
    /// Returns true if the request changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.price.is_none()
            && self.tag.is_none()
            && self.status.is_none()
            && self.images.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::ValidateExt;

    fn create_request() -> CreateContentRequest {
        CreateContentRequest {
            author_id: AuthorId::new(7),
            title: "Desk lamp".to_string(),
            content: "Barely used".to_string(),
            price: Some(12.5),
            campus_id: Some(1),
            goods_type: Some("furniture".to_string()),
            tag: None,
            images: Vec::new(),
        }
    }

    #[test]
    fn test_valid_create_request() {
        assert!(create_request().validate_request().is_ok());
    }

    #[test]
    fn test_blank_title_rejected() {
        let request = CreateContentRequest {
            title: "   ".to_string(),
            ..create_request()
        };
        let err = request.validate_request().unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn test_negative_price_rejected() {
        let request = CreateContentRequest {
            price: Some(-3.0),
            ..create_request()
        };
        assert!(request.validate_request().is_err());
    }

    #[test]
    fn test_update_price_validated_when_present() {
        let request = UpdateContentRequest {
            price: Some(f64::NAN),
            ..UpdateContentRequest::default()
        };
        let err = request.validate_request().unwrap_err();
        assert!(err.to_string().contains("price"));

        let request = UpdateContentRequest {
            price: Some(0.0),
            ..UpdateContentRequest::default()
        };
        assert!(request.validate_request().is_ok());
    }

    #[test]
    fn test_update_request_emptiness() {
        assert!(UpdateContentRequest::default().is_empty());
        let request = UpdateContentRequest {
            tag: Some("books".to_string()),
            ..UpdateContentRequest::default()
        };
        assert!(!request.is_empty());
        assert!(request.validate_request().is_ok());
    }
}
