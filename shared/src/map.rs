//! GeoJSON projection of the roster for the map screen.

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;

use crate::presence::{Member, PresenceStore};
use crate::{format_time_ago, UnixTimeMs};

fn member_feature(member: &Member, now: UnixTimeMs) -> Option<Feature> {
    let location = member.location?;
    // GeoJSON positions are [longitude, latitude].
    let geometry = Geometry::new(Value::Point(vec![
        location.coordinate.lng(),
        location.coordinate.lat(),
    ]));

    let mut properties = JsonObject::new();
    properties.insert("name".into(), json!(member.name));
    properties.insert("status".into(), json!(member.status.label()));
    properties.insert("avatar".into(), json!(member.avatar_url));
    properties.insert(
        "updated".into(),
        json!(format_time_ago(location.captured_at.as_millis(), now.as_millis())),
    );
    properties.insert("is_self".into(), json!(member.id.is_self()));

    Some(Feature {
        bbox: None,
        geometry: Some(geometry),
        id: Some(Id::Number(member.id.0.into())),
        properties: Some(properties),
        foreign_members: None,
    })
}

/// One point feature per member with a known location.
#[must_use]
pub fn roster_features(store: &PresenceStore, now: UnixTimeMs) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: store
            .members()
            .iter()
            .filter_map(|m| member_feature(m, now))
            .collect(),
        foreign_members: None,
    }
}

pub fn roster_geojson(store: &PresenceStore, now: UnixTimeMs) -> Result<String, serde_json::Error> {
    serde_json::to_string(&roster_features(store, now))
}
