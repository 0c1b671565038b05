//! Restaurant listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A restaurant listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    /// Row identifier.
    pub restaurant_id: i64,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Public path of the uploaded image, e.g. `/uploads/image-....jpg`.
    pub image_path: Option<String>,
    /// User who created the listing.
    pub creator_user_id: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// A validated restaurant to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRestaurant {
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Public path of the stored image.
    pub image_path: Option<String>,
}

impl NewRestaurant {
    /// Validate the textual form fields of a restaurant submission.
    ///
    /// Coordinates arrive as strings from multipart forms and are parsed here.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for missing fields, unparsable coordinates,
    /// or coordinates outside their geographic range.
    pub fn validate(
        name: Option<&str>,
        description: Option<&str>,
        latitude: Option<&str>,
        longitude: Option<&str>,
    ) -> Result<Self> {
        let name = required("name", name)?;
        let description = required("description", description)?;
        let latitude = coordinate("latitude", latitude, 90.0)?;
        let longitude = coordinate("longitude", longitude, 180.0)?;

        Ok(Self {
            name,
            description,
            latitude,
            longitude,
            image_path: None,
        })
    }

    /// Attach the public path of the stored image.
    #[must_use]
    pub fn with_image(mut self, image_path: impl Into<String>) -> Self {
        self.image_path = Some(image_path.into());
        self
    }
}

fn required(field: &str, value: Option<&str>) -> Result<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| Error::invalid_argument(format!("{field} is required")))
}

fn coordinate(field: &str, value: Option<&str>, bound: f64) -> Result<f64> {
    let raw = required(field, value)?;
    let parsed: f64 = raw
        .parse()
        .map_err(|_| Error::invalid_argument(format!("{field} must be a number")))?;

    if !parsed.is_finite() || parsed.abs() > bound {
        return Err(Error::invalid_argument(format!(
            "{field} must be between -{bound} and {bound}"
        )));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ok() {
        let r = NewRestaurant::validate(
            Some("Trattoria Single-Threaded"),
            Some("One dish at a time."),
            Some("41.9028"),
            Some("12.4964"),
        )
        .unwrap();
        assert_eq!(r.name, "Trattoria Single-Threaded");
        assert!((r.latitude - 41.9028).abs() < f64::EPSILON);
        assert!(r.image_path.is_none());
    }

    #[test]
    fn test_validate_missing_name() {
        let err = NewRestaurant::validate(None, Some("d"), Some("0"), Some("0")).unwrap_err();
        assert!(err.to_string().contains("name is required"));
    }

    #[test]
    fn test_validate_bad_coordinates() {
        assert!(NewRestaurant::validate(Some("n"), Some("d"), Some("north"), Some("0")).is_err());
        assert!(NewRestaurant::validate(Some("n"), Some("d"), Some("90.1"), Some("0")).is_err());
        assert!(NewRestaurant::validate(Some("n"), Some("d"), Some("0"), Some("-180.5")).is_err());
        assert!(NewRestaurant::validate(Some("n"), Some("d"), Some("NaN"), Some("0")).is_err());
    }

    #[test]
    fn test_with_image() {
        let r = NewRestaurant::validate(Some("n"), Some("d"), Some("0"), Some("0"))
            .unwrap()
            .with_image("/uploads/a.png");
        assert_eq!(r.image_path.as_deref(), Some("/uploads/a.png"));
    }
}
