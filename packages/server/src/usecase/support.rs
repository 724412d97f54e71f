//! Helpers shared by the room handlers.

use serde::Serialize;

use super::error::DispatchError;
use crate::{
    domain::{
        DisplayName, RandomSource, RoomId, RoomRecord, RoomRecordStore, Song, SongCatalog,
        Timestamp, UserId, ValueObjectError, Vote,
    },
    infrastructure::{
        dto::{
            conversion,
            websocket::{Envelope, MessageKind, VoteUpdateData},
        },
        room_manager::RoomManager,
    },
};
use rand::Rng;

pub(crate) fn envelope<T: Serialize>(
    kind: MessageKind,
    payload: &T,
    now: Timestamp,
) -> Result<Envelope, DispatchError> {
    Ok(Envelope::with_payload(kind, payload, now.value())?)
}

/// Load a record that must exist. A missing record means the room is gone.
pub(crate) async fn load_record(
    store: &dyn RoomRecordStore,
    room_id: &RoomId,
) -> Result<RoomRecord, DispatchError> {
    store
        .load(room_id)
        .await?
        .ok_or_else(|| DispatchError::RoomGone(room_id.to_string()))
}

/// `song_change` frame carrying the votes current members already cast on `song`.
pub(crate) async fn song_change_envelope(
    catalog: &dyn SongCatalog,
    room_manager: &RoomManager,
    room_id: &RoomId,
    song: &Song,
) -> Result<Envelope, DispatchError> {
    let member_ids: Vec<UserId> = room_manager
        .members(room_id)
        .await?
        .into_iter()
        .map(|m| m.user_id)
        .collect();
    let votes = catalog.get_room_members_votes(song.id, &member_ids).await?;
    envelope(
        MessageKind::SongChange,
        &conversion::song_change(song, &votes),
        room_manager.now(),
    )
}

/// Validate an inbound vote and stamp it with the sender's identity.
pub(crate) fn stamped_vote(
    user_id: &UserId,
    display_name: &DisplayName,
    data: VoteUpdateData,
) -> Result<VoteUpdateData, DispatchError> {
    if !(Vote::MIN_RATING..=Vote::MAX_RATING).contains(&data.rating) {
        return Err(ValueObjectError::InvalidRating(data.rating).into());
    }
    Ok(VoteUpdateData {
        user_id: user_id.as_str().to_string(),
        username: display_name.as_str().to_string(),
        ..data
    })
}

/// Uniformly pick one item.
pub(crate) fn choose<'a, T>(random: &RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    let index = random.with_rng(|rng| rng.random_range(0..items.len()));
    items.get(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_empty_and_single() {
        // テスト項目: 空なら None、1 件ならその要素
        // given (前提条件):
        let random = RandomSource::seeded(1);

        // when / then:
        assert!(choose::<u32>(&random, &[]).is_none());
        assert_eq!(choose(&random, &[7]), Some(&7));
    }

    #[test]
    fn test_stamped_vote_uses_sender_identity() {
        // テスト項目: ペイロードのユーザー情報は送信者で上書きされる
        // given (前提条件):
        let data = VoteUpdateData {
            user_id: "someone-else".to_string(),
            username: "mallory".to_string(),
            rating: 8,
            comment: "nice".to_string(),
        };

        // when (操作):
        let stamped = stamped_vote(
            &UserId::new("u1".to_string()).unwrap(),
            &DisplayName::new("alice".to_string()).unwrap(),
            data,
        )
        .unwrap();

        // then (期待する結果):
        assert_eq!(stamped.user_id, "u1");
        assert_eq!(stamped.username, "alice");
        assert_eq!(stamped.rating, 8);
    }

    #[test]
    fn test_stamped_vote_rejects_out_of_range_rating() {
        // テスト項目: 範囲外の評価は InvalidPayload
        // given (前提条件):
        let data = VoteUpdateData {
            user_id: String::new(),
            username: String::new(),
            rating: 11,
            comment: String::new(),
        };

        // when (操作):
        let result = stamped_vote(
            &UserId::new("u1".to_string()).unwrap(),
            &DisplayName::new("alice".to_string()).unwrap(),
            data,
        );

        // then (期待する結果):
        assert!(matches!(result, Err(DispatchError::InvalidPayload(_))));
    }
}
