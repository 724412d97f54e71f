//! Shared application state.

use std::sync::Arc;

use crate::{
    domain::RoomRecordStore,
    infrastructure::room_manager::RoomManager,
    usecase::{CreateRoomUseCase, DispatchMessageUseCase, JoinRoomUseCase, LeaveRoomUseCase},
};

pub struct AppState {
    /// CreateRoomUseCase（ルーム作成）
    pub create_room_usecase: Arc<CreateRoomUseCase>,
    /// JoinRoomUseCase（接続時のルーム参加）
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    /// LeaveRoomUseCase（切断時の退出）
    pub leave_room_usecase: Arc<LeaveRoomUseCase>,
    /// DispatchMessageUseCase（受信フレームの処理）
    pub dispatch_usecase: Arc<DispatchMessageUseCase>,
    /// ライブルームの参照（一覧・詳細）
    pub room_manager: Arc<RoomManager>,
    /// 永続レコードの参照（詳細）
    pub store: Arc<dyn RoomRecordStore>,
}
