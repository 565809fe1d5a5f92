use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    #[serde(rename = "fullName", default)]
    pub full_name: String,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string, never the plain password.
    pub password: String,
    pub created_at: String,
    #[serde(default)]
    pub no_of_blogs: i64,
    #[serde(default)]
    pub followers: i64,
    #[serde(default)]
    pub followings: i64,
}

impl User {
    /// Fields safe to hand back to clients.
    pub fn public_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "fullName": self.full_name,
            "username": self.username,
            "email": self.email,
            "created_at": self.created_at,
            "no_of_blogs": self.no_of_blogs,
            "followers": self.followers,
            "followings": self.followings,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Blog {
    pub id: String,
    pub title: String,
    pub blog_content: String,
    pub author_id: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub blog_image: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub comments: i64,
    #[serde(default)]
    pub liked_by: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub trending: bool,
}

impl Blog {
    /// Flips `user` in the liked-by list and adjusts the like counter.
    /// Returns whether the blog is liked by `user` afterwards.
    pub fn toggle_like(&mut self, user: &str) -> bool {
        match self.liked_by.iter().position(|u| u == user) {
            Some(idx) => {
                self.liked_by.remove(idx);
                self.likes = (self.likes - 1).max(0);
                false
            }
            None => {
                self.liked_by.push(user.to_string());
                self.likes += 1;
                true
            }
        }
    }
}

/// A blog as listed to readers, with the author's display fields filled in.
#[derive(Serialize, Debug)]
pub struct BlogView {
    #[serde(flatten)]
    pub blog: Blog,
    pub author_name: Option<String>,
    pub author_username: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Comment {
    pub comment_id: String,
    pub blog_id: String,
    pub author_id: String,
    /// Set for replies; top-level comments have none.
    #[serde(default)]
    pub parent_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub likes: i64,
    pub created_at: String,
}

/// Envelope wrapped around every JSON response.
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T = serde_json::Value> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog() -> Blog {
        Blog {
            id: "b1".to_string(),
            title: "Hello world".to_string(),
            blog_content: "body".to_string(),
            author_id: "u1".to_string(),
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000000Z".to_string(),
            tags: vec![],
            blog_image: String::new(),
            category: String::new(),
            views: 0,
            likes: 0,
            comments: 0,
            liked_by: vec![],
            featured: false,
            trending: false,
        }
    }

    #[test]
    fn toggle_like_twice_restores_state() {
        let mut b = blog();
        assert!(b.toggle_like("alice"));
        assert_eq!(b.likes, 1);
        assert_eq!(b.liked_by, vec!["alice"]);

        assert!(!b.toggle_like("alice"));
        assert_eq!(b.likes, 0);
        assert!(b.liked_by.is_empty());
    }

    #[test]
    fn toggle_like_tracks_users_independently() {
        let mut b = blog();
        b.toggle_like("alice");
        b.toggle_like("bob");
        b.toggle_like("alice");
        assert_eq!(b.likes, 1);
        assert_eq!(b.liked_by, vec!["bob"]);
    }

    #[test]
    fn blog_view_flattens_blog_fields() {
        let view = BlogView {
            blog: blog(),
            author_name: Some("Alice A".to_string()),
            author_username: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["title"], "Hello world");
        assert_eq!(json["author_name"], "Alice A");
        assert!(json["author_username"].is_null());
    }

    #[test]
    fn error_envelope_omits_data() {
        let json = serde_json::to_value(ApiResponse::error("nope")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "message": "nope"}));
    }
}
