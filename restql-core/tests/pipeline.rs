//! End-to-end translation tests: URL pairs through the planner and back
//! through the shaper with simulated driver rows.

use serde_json::{json, Value as JsonValue};

use restql_core::parse_query;
use restql_core::plan::rel::ConventionResolver;
use restql_core::plan::Planner;
use restql_core::shape::Shaper;

fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
    raw.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Pull the `AS` labels out of a planned projection so simulated rows can
/// use exactly the labels the database would report.
fn projection_labels(sql: &str) -> Vec<String> {
    let start = sql.find("SELECT ").map(|i| i + 7).unwrap_or(0);
    let end = sql.find(" FROM ").unwrap_or(sql.len());
    sql[start..end]
        .split(", ")
        .map(|item| match item.split_once(" AS ") {
            Some((_, label)) => label.to_string(),
            None => item.rsplit('.').next().unwrap_or(item).to_string(),
        })
        .collect()
}

#[test]
fn flat_select_recovers_row_fields() {
    let query = parse_query("artist", &pairs(&[("artist_id", "eq.1")])).unwrap();
    let planned = Planner::new(&ConventionResolver).plan_select(&query).unwrap();
    assert_eq!(
        planned.sql,
        "SELECT t1.* FROM artist AS t1 WHERE t1.artist_id = ?"
    );

    // `t1.*` reports the bare column names.
    let row = vec![
        ("artist_id".to_string(), json!(1)),
        ("name".to_string(), json!("AC/DC")),
    ];
    let shaper = Shaper::new("artist", !query.embeds.is_empty());
    assert_eq!(
        shaper.shape_row(&row),
        json!({"artist_id": 1, "name": "AC/DC"})
    );
}

#[test]
fn embed_labels_round_trip_through_the_shaper() {
    let query = parse_query(
        "track",
        &pairs(&[("select", "track_id,name,album(title,artist(name))")]),
    )
    .unwrap();
    let planned = Planner::new(&ConventionResolver).plan_select(&query).unwrap();

    let labels = projection_labels(&planned.sql);
    assert_eq!(
        labels,
        vec![
            "track__track_id",
            "track__name",
            "album__title",
            "album__artist__name",
        ]
    );

    let values = [json!(3), json!("Fast As a Shark"), json!("Restless and Wild"), json!("Accept")];
    let row: Vec<(String, JsonValue)> = labels
        .into_iter()
        .zip(values.into_iter())
        .collect();

    let shaper = Shaper::new("track", true);
    assert_eq!(
        shaper.shape_row(&row),
        json!({
            "track_id": 3,
            "name": "Fast As a Shark",
            "album": {
                "title": "Restless and Wild",
                "artist": {"name": "Accept"}
            }
        })
    );
}

#[test]
fn unmatched_outer_join_collapses_to_null() {
    let query = parse_query("users", &pairs(&[("select", "id,posts(id,title)")])).unwrap();
    let planned = Planner::new(&ConventionResolver).plan_select(&query).unwrap();
    let labels = projection_labels(&planned.sql);
    assert_eq!(labels, vec!["users__id", "posts__id", "posts__title"]);

    let row: Vec<(String, JsonValue)> = labels
        .into_iter()
        .zip([json!(1), JsonValue::Null, JsonValue::Null])
        .collect();
    let shaper = Shaper::new("users", true);
    assert_eq!(shaper.shape_row(&row), json!({"id": 1, "posts": null}));
}

#[test]
fn shaped_top_level_keys_match_select_and_embeds() {
    let query = parse_query(
        "track",
        &pairs(&[("select", "track_id,name,album(title)")]),
    )
    .unwrap();
    let planned = Planner::new(&ConventionResolver).plan_select(&query).unwrap();
    let labels = projection_labels(&planned.sql);

    let row: Vec<(String, JsonValue)> = labels
        .into_iter()
        .zip([json!(1), json!("x"), json!("y")])
        .collect();
    let shaped = Shaper::new("track", true).shape_row(&row);

    let mut keys: Vec<String> = shaped
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["album", "name", "track_id"]);
}
