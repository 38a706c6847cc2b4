pub const TOPIC_HUB_GROUP_STATE_FILTER: &str = "heating/hub/groups/+/state";
pub const TOPIC_HUB_EVENTS: &str = "heating/hub/events";

const TOPIC_HUB_GROUP_PREFIX: &str = "heating/hub/groups/";
const TOPIC_STATE_SUFFIX: &str = "/state";
const TOPIC_SET_POINT_SUFFIX: &str = "/set_point";

pub fn group_set_point_topic(group_id: &str) -> String {
    format!("{TOPIC_HUB_GROUP_PREFIX}{group_id}{TOPIC_SET_POINT_SUFFIX}")
}

/// Extracts the group id from a retained `heating/hub/groups/{id}/state` topic.
pub fn group_id_from_state_topic(topic: &str) -> Option<&str> {
    let id = topic
        .strip_prefix(TOPIC_HUB_GROUP_PREFIX)?
        .strip_suffix(TOPIC_STATE_SUFFIX)?;
    if id.is_empty() || id.contains('/') {
        None
    } else {
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_set_point_topic() {
        assert_eq!(
            group_set_point_topic("living-room"),
            "heating/hub/groups/living-room/set_point"
        );
    }

    #[test]
    fn parses_group_id_from_state_topic() {
        assert_eq!(
            group_id_from_state_topic("heating/hub/groups/abc-123/state"),
            Some("abc-123")
        );
        assert_eq!(group_id_from_state_topic("heating/hub/groups//state"), None);
        assert_eq!(
            group_id_from_state_topic("heating/hub/groups/a/b/state"),
            None
        );
        assert_eq!(group_id_from_state_topic(TOPIC_HUB_EVENTS), None);
    }
}
