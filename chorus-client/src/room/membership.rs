use chorus_core::StreamId;
use std::collections::HashSet;

/// Result of diffing a server-reported membership list against local state.
#[derive(Debug, Default, PartialEq)]
pub struct MembershipDiff {
    /// Streams present in the update but not tracked before, in update order.
    pub joined: Vec<StreamId>,
    /// Streams tracked before but absent from the update.
    pub left: Vec<StreamId>,
}

/// Pure set difference between the previous membership and a reported list.
/// `joined` and `left` are always disjoint; an unchanged list produces an
/// empty diff.
pub fn diff_membership(previous: &HashSet<StreamId>, updated: &[StreamId]) -> MembershipDiff {
    let updated_set: HashSet<&StreamId> = updated.iter().collect();
    MembershipDiff {
        joined: updated
            .iter()
            .filter(|id| !previous.contains(*id))
            .cloned()
            .collect(),
        left: previous
            .iter()
            .filter(|id| !updated_set.contains(*id))
            .cloned()
            .collect(),
    }
}

/// Local view of the joined room: the server-assigned own stream id and the
/// authoritative set of remote streams currently present. Mutated only by the
/// membership tracking below.
#[derive(Debug)]
pub struct Room {
    room_id: String,
    my_stream_id: Option<StreamId>,
    membership: HashSet<StreamId>,
}

impl Room {
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            my_stream_id: None,
            membership: HashSet::new(),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn my_stream_id(&self) -> Option<&StreamId> {
        self.my_stream_id.as_ref()
    }

    pub fn membership(&self) -> &HashSet<StreamId> {
        &self.membership
    }

    /// First confirmation after join: store the assigned own id and take the
    /// initial list verbatim. Returns the initial remote streams as joined.
    /// The own id never enters the membership set.
    pub fn apply_joined_room(
        &mut self,
        my_stream_id: StreamId,
        streams: Vec<StreamId>,
    ) -> Vec<StreamId> {
        self.my_stream_id = Some(my_stream_id);
        let joined: Vec<StreamId> = streams
            .into_iter()
            .filter(|id| Some(id) != self.my_stream_id.as_ref())
            .collect();
        self.membership = joined.iter().cloned().collect();
        joined
    }

    /// Periodic `getRoomInfo` response: diff the reported full list against
    /// local state and replace it. Joins are reported before leaves; a
    /// replayed identical list yields an empty diff.
    pub fn apply_room_info(&mut self, streams: Vec<StreamId>) -> MembershipDiff {
        let filtered: Vec<StreamId> = streams
            .into_iter()
            .filter(|id| Some(id) != self.my_stream_id.as_ref())
            .collect();
        let diff = diff_membership(&self.membership, &filtered);
        self.membership = filtered.into_iter().collect();
        diff
    }

    pub fn clear(&mut self) {
        self.membership.clear();
    }
}
