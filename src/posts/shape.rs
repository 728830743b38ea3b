use serde::Serialize;

/// Restricted projection of a listing's owning account. Always present on a
/// shaped listing; when no owner row could be joined the unknown-user
/// sentinel is substituted instead.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerInfo {
    pub id: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub verified: bool,
    pub show_contact_info: bool,
    pub member_since: i64,
    pub location: String,
}

impl OwnerInfo {
    pub fn from_owner(
        id: String,
        username: String,
        email: String,
        display_name: Option<String>,
        avatar: Option<String>,
        created_at: i64,
        city: &str,
    ) -> Self {
        let display_name = display_name.unwrap_or_else(|| username.clone());
        Self {
            id,
            username,
            email,
            display_name,
            avatar,
            verified: false,
            show_contact_info: true,
            member_since: created_at,
            location: format!("{city} area"),
        }
    }

    pub fn unknown(city: &str) -> Self {
        Self {
            id: "unknown".to_owned(),
            username: "unknown".to_owned(),
            email: String::new(),
            display_name: "Unknown user".to_owned(),
            avatar: None,
            verified: false,
            show_contact_info: true,
            member_since: 0,
            location: format!("{city} area"),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailBody {
    pub description: Option<String>,
    pub utilities: Option<String>,
    pub pet_policy: Option<String>,
    pub income_policy: Option<String>,
    pub size: Option<i64>,
    pub school: Option<i64>,
    pub bus: Option<i64>,
    pub restaurant: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapedPost {
    pub id: String,
    pub title: String,
    pub price: i64,
    pub images: Vec<String>,
    pub address: Option<String>,
    pub city: String,
    pub bedroom: Option<i64>,
    pub bathroom: Option<i64>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub property: Option<String>,
    pub user_id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub owner: OwnerInfo,
    pub detail: Option<DetailBody>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_falls_back_to_username() {
        let owner = OwnerInfo::from_owner(
            "u1".into(),
            "jane".into(),
            "jane@example.com".into(),
            None,
            None,
            1700000000,
            "Berlin",
        );
        assert_eq!(owner.display_name, "jane");
        assert_eq!(owner.location, "Berlin area");
        assert!(!owner.verified);
        assert!(owner.show_contact_info);
    }

    #[test]
    fn explicit_display_name_wins() {
        let owner = OwnerInfo::from_owner(
            "u1".into(),
            "jane".into(),
            "jane@example.com".into(),
            Some("Jane D.".into()),
            None,
            1700000000,
            "Berlin",
        );
        assert_eq!(owner.display_name, "Jane D.");
    }

    #[test]
    fn unknown_owner_sentinel_is_always_present() {
        let owner = OwnerInfo::unknown("Hamburg");
        assert_eq!(owner.username, "unknown");
        assert_eq!(owner.location, "Hamburg area");
        let json = serde_json::to_value(&owner).unwrap();
        assert_eq!(json["showContactInfo"], true);
        assert_eq!(json["verified"], false);
    }
}
