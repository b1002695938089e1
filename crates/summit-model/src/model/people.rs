use bridge_core::{
    AttributeDescriptor, Entity, EntityDescriptor, Identifier, RelationshipDescriptor, ScalarKind,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::summit::Summit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: Identifier<Company>,
    pub name: String,
}

impl Entity for Company {
    const NAME: &'static str = "Company";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("name", ScalarKind::String)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    pub id: Identifier<Speaker>,
    pub first_name: String,
    pub last_name: String,
    pub title: Option<String>,
    pub pic: String,
    pub twitter: Option<String>,
    pub irc: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub affiliations: Vec<Identifier<Affiliation>>,
}

impl Speaker {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for Speaker {
    const NAME: &'static str = "Speaker";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("first_name", ScalarKind::String)
            .required("last_name", ScalarKind::String)
            .optional("title", ScalarKind::String)
            .required("pic", ScalarKind::String)
            .optional("twitter", ScalarKind::String)
            .optional("irc", ScalarKind::String)
            .optional("bio", ScalarKind::String)
            .relationship(
                RelationshipDescriptor::to_many("affiliations", Affiliation::NAME).optional(),
            )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affiliation {
    pub id: Identifier<Affiliation>,
    #[serde(rename = "owner_id")]
    pub member: Identifier<Speaker>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub end_date: Option<DateTime<Utc>>,
    pub is_current: bool,
    pub organization: Identifier<AffiliationOrganization>,
}

impl Entity for Affiliation {
    const NAME: &'static str = "Affiliation";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .attribute(
                AttributeDescriptor::new("start_date", ScalarKind::Integer).clear_when_absent(),
            )
            .attribute(AttributeDescriptor::new("end_date", ScalarKind::Integer).clear_when_absent())
            .required("is_current", ScalarKind::Bool)
            .relationship(RelationshipDescriptor::to_one("member", Speaker::NAME).wire("owner_id"))
            .relationship(RelationshipDescriptor::to_one(
                "organization",
                AffiliationOrganization::NAME,
            ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffiliationOrganization {
    pub id: Identifier<AffiliationOrganization>,
    pub name: String,
}

impl Entity for AffiliationOrganization {
    const NAME: &'static str = "AffiliationOrganization";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("name", ScalarKind::String)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketType {
    pub id: Identifier<TicketType>,
    pub name: String,
    pub description: Option<String>,
}

impl Entity for TicketType {
    const NAME: &'static str = "TicketType";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("name", ScalarKind::String)
            .optional("description", ScalarKind::String)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirelessNetwork {
    pub id: Identifier<WirelessNetwork>,
    pub name: String,
    pub password: String,
    pub description: Option<String>,
    #[serde(rename = "summit_id")]
    pub summit: Identifier<Summit>,
}

impl Entity for WirelessNetwork {
    const NAME: &'static str = "WirelessNetwork";

    fn descriptor() -> EntityDescriptor {
        EntityDescriptor::new(Self::NAME)
            .identifier("id", ScalarKind::Integer)
            .required("name", ScalarKind::String)
            .required("password", ScalarKind::String)
            .optional("description", ScalarKind::String)
            .relationship(RelationshipDescriptor::to_one("summit", Summit::NAME).wire("summit_id"))
    }
}
