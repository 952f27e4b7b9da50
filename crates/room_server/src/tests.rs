// Include tests
#[cfg(test)]
mod tests {
    use crate::*;
    use huddle_presence::{
        AdminEvent, ConnectionId, GroupEvent, JoinRequest, PointPosition, ProximityConfig,
        RoomError, SessionId, ZoneEvent,
    };
    use std::sync::Arc;

    const OFFICE: &str = "_/global/maps.example.org/office.json";
    const LOBBY: &str = "@/acme/campus/lobby";

    fn request(name: &str, x: f64, y: f64) -> JoinRequest {
        JoinRequest::new(name, PointPosition::new(x, y))
    }

    #[tokio::test]
    async fn test_create_room_is_get_or_create() {
        let registry = create_registry(ServerConfig::default());
        let first = registry.create_room(OFFICE).unwrap();
        let second = registry.create_room(OFFICE).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.room_count(), 1);

        registry.create_room(LOBBY).unwrap();
        assert_eq!(registry.room_ids(), vec![OFFICE.to_string(), LOBBY.to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_room_id_is_rejected() {
        let registry = create_registry(ServerConfig::default());
        assert!(matches!(registry.create_room("lobby"), Err(ServerError::RoomId(_))));
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn test_rooms_use_configured_proximity() {
        let config = ServerConfig {
            proximity: ProximityConfig {
                min_distance: 200.0,
                ..ProximityConfig::default()
            },
            ..ServerConfig::default()
        };
        let registry = create_registry(config);
        let a = registry.join(OFFICE, ConnectionId(1), request("A", 0.0, 0.0)).await.unwrap();
        let b = registry.join(OFFICE, ConnectionId(2), request("B", 150.0, 0.0)).await.unwrap();

        let grouped = registry
            .with_room(OFFICE, |room| {
                room.participant(a).and_then(|p| p.group()) == room.participant(b).and_then(|p| p.group())
                    && room.participant(a).is_some_and(|p| p.is_grouped())
            })
            .await;
        assert_eq!(grouped, Some(true));
    }

    #[tokio::test]
    async fn test_empty_rooms_are_reaped() {
        let registry = create_registry(ServerConfig::default());
        let session = registry.join(OFFICE, ConnectionId(1), request("A", 0.0, 0.0)).await.unwrap();
        registry.create_room(LOBBY).unwrap();

        assert!(!registry.destroy_room_when_empty(OFFICE).await);
        assert_eq!(registry.reap_empty_rooms().await, 1);
        assert!(registry.room(LOBBY).is_none());

        registry
            .with_room(OFFICE, |room| room.leave(session))
            .await
            .unwrap()
            .unwrap();
        assert!(registry.destroy_room_when_empty(OFFICE).await);
        assert!(!registry.destroy_room_when_empty(OFFICE).await);
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn test_room_with_admin_is_kept() {
        let registry = create_registry(ServerConfig::default());
        let connections = ConnectionManager::new();
        let (admin, mut admin_rx) = connections.open_admin_session();

        registry.admin_join(LOBBY, admin).await.unwrap();
        assert_eq!(registry.reap_empty_rooms().await, 0);

        let request = request("A", 0.0, 0.0);
        let uuid = request.uuid;
        registry.join(LOBBY, ConnectionId(1), request).await.unwrap();
        assert!(matches!(admin_rx.try_recv(), Ok(AdminEvent::UserJoin { uuid: u, .. }) if u == uuid));
    }

    #[tokio::test]
    async fn test_join_after_reap_lands_in_fresh_room() {
        let registry = create_registry(ServerConfig::default());
        let stale = registry.create_room(OFFICE).unwrap();
        assert!(registry.destroy_room_when_empty(OFFICE).await);

        let session = registry.join(OFFICE, ConnectionId(1), request("A", 0.0, 0.0)).await.unwrap();
        assert_eq!(session, SessionId(1));
        assert_eq!(stale.lock().await.participant_count(), 0);
        let live = registry.room(OFFICE).unwrap();
        assert!(!Arc::ptr_eq(&stale, &live));
        assert_eq!(live.lock().await.participant_count(), 1);
    }

    #[tokio::test]
    async fn test_admin_attached_after_reap_hears_joins() {
        let registry = create_registry(ServerConfig::default());
        let connections = ConnectionManager::new();
        let (admin, mut admin_rx) = connections.open_admin_session();

        let stale = registry.create_room(LOBBY).unwrap();
        assert!(registry.destroy_room_when_empty(LOBBY).await);

        registry.admin_join(LOBBY, admin).await.unwrap();
        assert_eq!(stale.lock().await.admin_count(), 0);

        let request = request("A", 0.0, 0.0);
        let uuid = request.uuid;
        registry.join(LOBBY, ConnectionId(1), request).await.unwrap();
        assert!(matches!(admin_rx.try_recv(), Ok(AdminEvent::UserJoin { uuid: u, .. }) if u == uuid));
    }

    #[tokio::test]
    async fn test_listener_attached_after_reap_sees_participants() {
        let registry = create_registry(ServerConfig::default());
        let connections = ConnectionManager::new();
        let (listener, mut rx) = connections.open_zone_listener();

        registry.create_room(OFFICE).unwrap();
        assert!(registry.destroy_room_when_empty(OFFICE).await);

        registry.add_zone_listener(OFFICE, listener, 0.0, 0.0).await.unwrap();
        registry.join(OFFICE, ConnectionId(1), request("A", 5.0, 5.0)).await.unwrap();
        assert!(matches!(rx.try_recv(), Ok(ZoneEvent::Enter { .. })));
    }

    #[tokio::test]
    async fn test_with_room_skips_reaped_rooms() {
        let registry = create_registry(ServerConfig::default());
        assert!(registry.with_room(OFFICE, |room| room.participant_count()).await.is_none());

        registry.create_room(OFFICE).unwrap();
        assert_eq!(registry.with_room(OFFICE, |room| room.participant_count()).await, Some(0));

        assert!(registry.destroy_room_when_empty(OFFICE).await);
        assert!(registry.with_room(OFFICE, |room| room.participant_count()).await.is_none());
    }

    #[tokio::test]
    async fn test_listener_with_unusable_position_is_refused() {
        let registry = create_registry(ServerConfig::default());
        let connections = ConnectionManager::new();
        let (listener, _rx) = connections.open_zone_listener();
        let result = registry.add_zone_listener(OFFICE, listener, f64::NAN, 0.0).await;
        assert!(matches!(result, Err(ServerError::Room(RoomError::InvalidPosition { .. }))));
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let config = ServerConfig {
            reap_interval_ms: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(RoomRegistry::try_new(config), Err(ServerError::Config(_))));
        assert!(RoomRegistry::try_new(ServerConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_missing_position_surfaces_as_room_error() {
        let registry = create_registry(ServerConfig::default());
        let mut request = request("Ghost", 0.0, 0.0);
        request.position = None;
        let result = registry.join(OFFICE, ConnectionId(1), request).await;
        assert!(matches!(result, Err(ServerError::Room(RoomError::MissingPosition))));
        assert!(!result.unwrap_err().is_fatal_for_room());
    }

    #[tokio::test]
    async fn test_group_events_reach_registry_sender() {
        let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
        let registry = create_registry(ServerConfig::default()).with_group_events(sender);
        registry.join(OFFICE, ConnectionId(7), request("A", 0.0, 0.0)).await.unwrap();
        registry.join(OFFICE, ConnectionId(8), request("B", 10.0, 0.0)).await.unwrap();

        let mut connections = Vec::new();
        while let Ok(GroupEvent::Joined { connection, .. }) = receiver.try_recv() {
            connections.push(connection);
        }
        assert_eq!(connections, vec![ConnectionId(8), ConnectionId(7)]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_joins_are_serialized_per_room() {
        let registry = Arc::new(create_registry(ServerConfig::default()));
        let mut handles = Vec::new();
        for i in 0..32u64 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let room = if i % 2 == 0 { OFFICE } else { LOBBY };
                let x = (i * 500) as f64;
                registry
                    .join(room, ConnectionId(i), request(&format!("p{i}"), x, 0.0))
                    .await
            }));
        }
        let mut sessions = Vec::new();
        for handle in handles {
            sessions.push(handle.await.unwrap().unwrap());
        }

        let stats = registry.stats().await;
        assert_eq!(stats.rooms, 2);
        assert_eq!(stats.participants, 32);
        sessions.sort();
        sessions.dedup();
        // Ids are per room: 1..=16 in each
        assert_eq!(sessions.len(), 16);
    }

    #[tokio::test]
    async fn test_shutdown_releases_rooms_and_refuses_joins() {
        let registry = create_registry(ServerConfig::default());
        registry.join(OFFICE, ConnectionId(1), request("A", 0.0, 0.0)).await.unwrap();

        registry.shutdown();
        assert!(registry.shutdown_state().is_drained());
        assert_eq!(registry.room_count(), 0);
        assert!(matches!(
            registry.join(OFFICE, ConnectionId(2), request("B", 0.0, 0.0)).await,
            Err(ServerError::Internal(_))
        ));
        assert!(registry.create_room(LOBBY).is_err());

        let (admin, _rx) = ConnectionManager::new().open_admin_session();
        assert!(matches!(
            registry.admin_join(LOBBY, admin).await,
            Err(ServerError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_manager_bindings() {
        let connections = ConnectionManager::new();
        let first = connections.add_connection("127.0.0.1:4000".parse().unwrap()).await;
        let second = connections.add_connection("127.0.0.1:4001".parse().unwrap()).await;
        assert_ne!(first, second);
        assert_eq!(connections.connection_count().await, 2);

        assert!(connections.bind_session(first, OFFICE, SessionId(3)).await);
        assert!(!connections.bind_session(ConnectionId(999), OFFICE, SessionId(4)).await);
        assert_eq!(
            connections.session_of(first).await,
            Some((OFFICE.to_string(), SessionId(3)))
        );

        let removed = connections.remove_connection(first).await.unwrap();
        assert_eq!(removed.room_id(), Some(OFFICE));
        assert!(connections.remove_connection(first).await.is_none());

        let (a, _) = connections.open_zone_listener();
        let (b, _) = connections.open_zone_listener();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_listener_receives_events_through_registry() {
        let registry = create_registry(ServerConfig::default());
        let connections = ConnectionManager::new();
        let (listener, mut rx) = connections.open_zone_listener();

        let visible = registry.add_zone_listener(OFFICE, listener, 0.0, 0.0).await.unwrap();
        assert!(visible.is_empty());

        registry.join(OFFICE, ConnectionId(1), request("A", 5.0, 5.0)).await.unwrap();
        assert!(matches!(rx.try_recv(), Ok(ZoneEvent::Enter { .. })));
    }
}
