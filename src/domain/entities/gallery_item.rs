use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct GalleryItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub room_type: String,
    pub style: String,
    pub prompt: String,
    /// Storage path of the full-size image.
    pub image_url: String,
    /// Storage path of the thumbnail.
    pub thumb_url: Option<String>,
    pub is_favorite: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// File extension for a stored image given its content type.
pub fn image_extension(content_type: &str) -> &'static str {
    if content_type.contains("png") {
        "png"
    } else if content_type.contains("webp") {
        "webp"
    } else {
        "jpg"
    }
}

/// Storage paths for a gallery item: `(full, thumb)`.
pub fn storage_paths(user_id: Uuid, item_id: Uuid, content_type: &str) -> (String, String) {
    let base = format!("{user_id}/{item_id}");
    (
        format!("{base}/final.{}", image_extension(content_type)),
        format!("{base}/thumb.jpg"),
    )
}

/// Legacy thumbnail name sitting next to an image: `a/b.jpg` -> `a/b-thumb.jpg`.
pub fn legacy_thumb_path(image_path: &str) -> Option<String> {
    let file_start = image_path.rfind('/').map(|i| i + 1).unwrap_or(0);
    let dot = image_path[file_start..].rfind('.')? + file_start;
    if dot == file_start {
        return None;
    }
    let (stem, ext) = image_path.split_at(dot);
    Some(format!("{stem}-thumb{ext}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_from_content_type() {
        assert_eq!(image_extension("image/png"), "png");
        assert_eq!(image_extension("image/webp"), "webp");
        assert_eq!(image_extension("image/jpeg"), "jpg");
        assert_eq!(image_extension(""), "jpg");
    }

    #[test]
    fn paths_are_scoped_by_user_and_item() {
        let user = Uuid::nil();
        let item = Uuid::from_u128(1);
        let (full, thumb) = storage_paths(user, item, "image/png");
        assert_eq!(full, format!("{user}/{item}/final.png"));
        assert_eq!(thumb, format!("{user}/{item}/thumb.jpg"));
    }

    #[test]
    fn legacy_thumb_inserts_suffix_before_extension() {
        assert_eq!(
            legacy_thumb_path("u/1/final.jpg").as_deref(),
            Some("u/1/final-thumb.jpg")
        );
        assert_eq!(legacy_thumb_path("u/x.y/final").as_deref(), None);
        assert_eq!(legacy_thumb_path("u/.hidden").as_deref(), None);
        assert_eq!(legacy_thumb_path("plain").as_deref(), None);
    }
}
