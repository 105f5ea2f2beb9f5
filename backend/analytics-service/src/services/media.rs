//! Deterministic image URLs for dashboard cards
//!
//! Seeds come from the first UTF-16 code unit of the id so the same id always
//! maps to the same image. An empty id seeds from code unit 0.

/// Shown when an avatar fails to load
pub const AVATAR_FALLBACK_URL: &str = "https://placehold.co/150x150/gray/white?text=User";

/// Shown when a post image fails to load
pub const POST_IMAGE_FALLBACK_URL: &str =
    "https://placehold.co/800x600/gray/white?text=Image+Not+Available";

const AVATAR_VARIANTS: u32 = 5;
const AVATAR_OFFSET: u32 = 10;
const POST_IMAGE_VARIANTS: u32 = 10;

fn first_code_unit(id: &str) -> u32 {
    id.encode_utf16().next().map(u32::from).unwrap_or(0)
}

/// Avatar for a user id, one of five fixed pravatar images
pub fn user_avatar_url(user_id: &str) -> String {
    let seed = first_code_unit(user_id) % AVATAR_VARIANTS + 1;
    format!("https://i.pravatar.cc/150?img={}", seed + AVATAR_OFFSET)
}

/// Cover image for a post id, one of ten fixed picsum seeds
pub fn post_image_url(post_id: &str) -> String {
    let seed = first_code_unit(post_id) % POST_IMAGE_VARIANTS + 1;
    format!("https://picsum.photos/seed/{}/800/600", seed)
}

/// Avatar for a feed author, the placeholder when the author is unknown or has a blank id
pub fn avatar_url_or_fallback(user_id: Option<&str>) -> String {
    match user_id {
        Some(id) if !id.trim().is_empty() => user_avatar_url(id),
        _ => AVATAR_FALLBACK_URL.to_string(),
    }
}

/// Cover image for a post, the placeholder when the id is blank
pub fn image_url_or_fallback(post_id: &str) -> String {
    if post_id.trim().is_empty() {
        POST_IMAGE_FALLBACK_URL.to_string()
    } else {
        post_image_url(post_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_avatar_url() {
        // 'u' = 117, 117 % 5 + 1 = 3
        assert_eq!(user_avatar_url("u1"), "https://i.pravatar.cc/150?img=13");
        // 'a' = 97, 97 % 5 + 1 = 3
        assert_eq!(user_avatar_url("alice"), "https://i.pravatar.cc/150?img=13");
        // 'b' = 98
        assert_eq!(user_avatar_url("bob"), "https://i.pravatar.cc/150?img=14");
    }

    #[test]
    fn test_post_image_url() {
        // 'p' = 112, 112 % 10 + 1 = 3
        assert_eq!(post_image_url("p7"), "https://picsum.photos/seed/3/800/600");
        // '9' = 57
        assert_eq!(post_image_url("9f"), "https://picsum.photos/seed/8/800/600");
    }

    #[test]
    fn test_only_first_character_matters() {
        assert_eq!(user_avatar_url("u1"), user_avatar_url("u999"));
        assert_eq!(post_image_url("p1"), post_image_url("pzz"));
    }

    #[test]
    fn test_urls_are_deterministic() {
        for id in ["u1", "x", "é", "🙂post"] {
            assert_eq!(user_avatar_url(id), user_avatar_url(id));
            assert_eq!(post_image_url(id), post_image_url(id));
        }
    }

    #[test]
    fn test_non_bmp_uses_leading_surrogate() {
        // U+1F642 encodes as 0xD83D 0xDE42; 0xD83D = 55357
        assert_eq!(user_avatar_url("🙂"), "https://i.pravatar.cc/150?img=13");
        assert_eq!(post_image_url("🙂"), "https://picsum.photos/seed/8/800/600");
    }

    #[test]
    fn test_empty_id() {
        assert_eq!(user_avatar_url(""), "https://i.pravatar.cc/150?img=11");
        assert_eq!(post_image_url(""), "https://picsum.photos/seed/1/800/600");
    }

    #[test]
    fn test_avatar_fallback_for_unknown_author() {
        assert_eq!(avatar_url_or_fallback(None), AVATAR_FALLBACK_URL);
        assert_eq!(avatar_url_or_fallback(Some("  ")), AVATAR_FALLBACK_URL);
        assert_eq!(
            avatar_url_or_fallback(Some("u1")),
            "https://i.pravatar.cc/150?img=13"
        );
    }

    #[test]
    fn test_image_fallback_for_blank_id() {
        assert_eq!(image_url_or_fallback(""), POST_IMAGE_FALLBACK_URL);
        assert_eq!(
            image_url_or_fallback("p7"),
            "https://picsum.photos/seed/3/800/600"
        );
    }
}
