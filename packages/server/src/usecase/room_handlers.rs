//! Per-kind handler set.

use std::sync::Arc;

use super::{
    error::DispatchError, radio::RadioRoomHandler, rating::RatingRoomHandler,
    tournament::TournamentHandler,
};
use crate::{
    domain::{RandomSource, RoomKind, RoomRecord, RoomRecordStore, SongCatalog, TieBreaker, UserId},
    infrastructure::room_manager::RoomManager,
};

pub struct RoomHandlers {
    pub rating: RatingRoomHandler,
    pub radio: RadioRoomHandler,
    pub tournament: TournamentHandler,
}

impl RoomHandlers {
    pub fn new(
        catalog: Arc<dyn SongCatalog>,
        store: Arc<dyn RoomRecordStore>,
        room_manager: Arc<RoomManager>,
        random: Arc<RandomSource>,
        tie_breaker: Arc<dyn TieBreaker>,
    ) -> Self {
        Self {
            rating: RatingRoomHandler::new(
                catalog.clone(),
                store.clone(),
                room_manager.clone(),
                random.clone(),
            ),
            radio: RadioRoomHandler::new(
                catalog.clone(),
                store.clone(),
                room_manager.clone(),
                random,
            ),
            tournament: TournamentHandler::new(catalog, store, room_manager, tie_breaker),
        }
    }

    /// Send the state a newly joined user needs.
    pub async fn on_join(&self, user_id: &UserId, record: &RoomRecord) -> Result<(), DispatchError> {
        match record.kind {
            RoomKind::Rating => self.rating.on_join(user_id, record).await,
            RoomKind::Radio => self.radio.on_join(user_id, record).await,
            RoomKind::Tournament => self.tournament.on_join(user_id, record).await,
        }
    }
}
