use crate::error::MeshError;
use crate::media::{LocalCapture, LocalTrackPublisher};
use crate::registry::{PeerRegistry, RemoteStreams};
use crate::room::{MeshCommand, MeshConfig, MeshObserver, NoopObserver};
use crate::session::{Role, SessionState, SessionTransition};
use crate::signaling::SignalingOutput;
use crate::transport::{TransportEvent, TransportFactory};
use meshcall_core::{ConnectionState, ParticipantId, SignalMessage, TransportAddress};
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// The orchestrator's event loop. Owns the registry; every command, transport
/// event, timer and local media change is handled here, one at a time.
pub struct MeshRoom {
    local_id: ParticipantId,
    config: MeshConfig,
    registry: PeerRegistry,
    remote_streams: RemoteStreams,
    publisher: LocalTrackPublisher,
    observer: Arc<dyn MeshObserver>,
    signaling: Arc<dyn SignalingOutput>,
    /// Participants that left, with the time they left. Their signaling is
    /// dropped until they join again or `departed_ttl` passes.
    departed: HashMap<ParticipantId, Instant>,
    command_rx: mpsc::Receiver<MeshCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
}

impl MeshRoom {
    pub fn new(
        config: MeshConfig,
        command_rx: mpsc::Receiver<MeshCommand>,
        signaling: Arc<dyn SignalingOutput>,
        media: watch::Receiver<LocalCapture>,
        factory: Arc<dyn TransportFactory>,
        remote_streams: RemoteStreams,
    ) -> Self {
        let (transport_tx, transport_rx) = mpsc::channel(256);

        Self {
            local_id: config.local_id.clone(),
            registry: PeerRegistry::new(factory, transport_tx, config.timeouts()),
            config,
            remote_streams,
            publisher: LocalTrackPublisher::new(media),
            observer: Arc::new(NoopObserver),
            signaling,
            departed: HashMap::new(),
            command_rx,
            transport_rx,
        }
    }

    pub async fn run(mut self) {
        info!("Mesh room for {} started", self.local_id);

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => {
                            if self.handle_command(c).await.is_break() {
                                break;
                            }
                        }
                        None => {
                            info!("Command channel closed. Shutting down mesh room.");
                            self.shutdown().await;
                            break;
                        }
                    }
                }

                evt = self.transport_rx.recv() => {
                    match evt {
                        Some(e) => self.handle_transport_event(e).await,
                        None => {
                            warn!("Transport channel closed unexpectedly");
                            self.shutdown().await;
                            break;
                        }
                    }
                }

                capture = self.publisher.changed() => {
                    self.handle_local_media(capture).await;
                }
            }
        }

        info!("Mesh room for {} finished", self.local_id);
    }

    async fn handle_command(&mut self, cmd: MeshCommand) -> ControlFlow<()> {
        match cmd {
            MeshCommand::Signal(msg) => self.handle_signal(msg).await,

            MeshCommand::SetObserver(observer) => {
                debug!("Observer replaced");
                self.observer = observer;
            }

            MeshCommand::Sessions(reply) => {
                let _ = reply.send(self.registry.snapshots());
            }

            MeshCommand::Shutdown(done) => {
                self.shutdown().await;
                let _ = done.send(());
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }

    async fn handle_signal(&mut self, msg: SignalMessage) {
        if msg.participant_id() == &self.local_id {
            debug!("Ignoring own '{}' echoed by the channel", msg.event_name());
            return;
        }

        match msg {
            SignalMessage::ParticipantJoined {
                participant_id,
                transport_address,
                display_name,
            } => {
                self.on_participant_joined(participant_id, transport_address, display_name)
                    .await
            }

            SignalMessage::ParticipantLeft { participant_id } => {
                self.on_participant_left(participant_id).await
            }

            msg if self.is_departed(msg.participant_id()) => {
                debug!(
                    "Dropping '{}' from departed participant {}",
                    msg.event_name(),
                    msg.participant_id()
                );
            }

            SignalMessage::Offer {
                participant_id,
                transport_address,
                sdp,
            } => self.on_offer(participant_id, transport_address, sdp).await,

            SignalMessage::Answer {
                participant_id,
                transport_address,
                sdp,
            } => self.on_answer(participant_id, transport_address, sdp).await,

            SignalMessage::IceCandidate {
                participant_id,
                transport_address,
                candidate,
            } => {
                self.on_remote_candidate(participant_id, transport_address, candidate)
                    .await
            }
        }
    }

    async fn on_participant_joined(
        &mut self,
        participant_id: ParticipantId,
        transport_address: TransportAddress,
        display_name: Option<String>,
    ) {
        info!(
            "Participant {} joined at {} ({})",
            participant_id,
            transport_address,
            display_name.as_deref().unwrap_or("no display name")
        );
        self.departed.remove(&participant_id);

        let role = self
            .config
            .initiator_policy
            .role_for(&self.local_id, &participant_id);

        let result = self
            .registry
            .ensure_session(
                &participant_id,
                &transport_address,
                role,
                self.publisher.current(),
            )
            .await;

        let offer = match result {
            Err(e) => {
                error!("Failed to create session for {}: {}", participant_id, e);
                self.notify_state(&participant_id, ConnectionState::Failed).await;
                return;
            }
            Ok((_, false)) => {
                debug!("Duplicate join for {}; session kept", participant_id);
                return;
            }
            Ok((session, true)) if session.role() == Role::Initiator => {
                let offer = session.start_offer().await;
                offer.map(|sdp| Some((session.transport_address().clone(), sdp)))
            }
            Ok((_, true)) => Ok(None),
        };

        self.notify_state(&participant_id, ConnectionState::New).await;

        match offer {
            Ok(Some((to, sdp))) => {
                self.signaling.send_offer(to, sdp).await;
                self.notify_state(&participant_id, ConnectionState::Connecting)
                    .await;
            }
            Ok(None) => {}
            Err(e) => {
                error!("Failed to create offer for {}: {}", participant_id, e);
                self.remove_session(&participant_id, ConnectionState::Failed)
                    .await;
            }
        }
    }

    async fn on_participant_left(&mut self, participant_id: ParticipantId) {
        info!("Participant {} left", participant_id);
        let ttl = self.config.departed_ttl;
        self.departed.retain(|_, left_at| left_at.elapsed() < ttl);
        self.departed.insert(participant_id.clone(), Instant::now());
        self.remove_session(&participant_id, ConnectionState::Closed)
            .await;
    }

    fn is_departed(&self, participant_id: &ParticipantId) -> bool {
        self.departed
            .get(participant_id)
            .is_some_and(|left_at| left_at.elapsed() < self.config.departed_ttl)
    }

    async fn on_offer(
        &mut self,
        participant_id: ParticipantId,
        transport_address: TransportAddress,
        sdp: String,
    ) {
        let result = self
            .registry
            .ensure_session(
                &participant_id,
                &transport_address,
                Role::Responder,
                self.publisher.current(),
            )
            .await;

        let (session, created) = match result {
            Ok(found) => found,
            Err(e) => {
                error!("Failed to create session for {}: {}", participant_id, e);
                self.notify_state(&participant_id, ConnectionState::Failed).await;
                return;
            }
        };

        let was_idle = session.state() == SessionState::Idle;
        let answer = session
            .apply_remote_offer(sdp)
            .await
            .map(|answer| answer.map(|sdp| (session.transport_address().clone(), sdp)));

        if created {
            self.notify_state(&participant_id, ConnectionState::New).await;
        }

        match answer {
            Ok(Some((to, sdp))) => {
                self.signaling.send_answer(to, sdp).await;
                if was_idle {
                    self.notify_state(&participant_id, ConnectionState::Connecting)
                        .await;
                }
            }
            Ok(None) => {}
            Err(e) => self.on_session_error(&participant_id, e).await,
        }
    }

    async fn on_answer(
        &mut self,
        participant_id: ParticipantId,
        transport_address: TransportAddress,
        sdp: String,
    ) {
        let Some(session) = self.registry.get_mut(&participant_id) else {
            warn!("Ignoring answer from {} without a session", participant_id);
            return;
        };
        session.set_transport_address(transport_address);

        if let Err(e) = session.apply_remote_answer(sdp).await {
            self.on_session_error(&participant_id, e).await;
        }
    }

    async fn on_remote_candidate(
        &mut self,
        participant_id: ParticipantId,
        transport_address: TransportAddress,
        candidate: String,
    ) {
        let result = self
            .registry
            .ensure_session(
                &participant_id,
                &transport_address,
                Role::Responder,
                self.publisher.current(),
            )
            .await;

        let (session, created) = match result {
            Ok(found) => found,
            Err(e) => {
                error!("Failed to create session for {}: {}", participant_id, e);
                self.notify_state(&participant_id, ConnectionState::Failed).await;
                return;
            }
        };

        let applied = session.add_remote_candidate(candidate).await;

        if created {
            self.notify_state(&participant_id, ConnectionState::New).await;
        }
        if let Err(e) = applied {
            warn!("Failed to add ICE candidate for {}: {}", participant_id, e);
        }
    }

    /// Protocol errors are logged and the session kept; anything else ends it.
    async fn on_session_error(&mut self, participant_id: &ParticipantId, e: MeshError) {
        if e.is_protocol() {
            warn!("{}", e);
            return;
        }

        error!("Session with {} failed: {}", participant_id, e);
        self.remove_session(participant_id, ConnectionState::Failed)
            .await;
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        let Some(session) = self.registry.active_mut(event.key()) else {
            debug!("Dropping stale transport event for {}", event.key());
            return;
        };
        let participant_id = session.participant_id().clone();

        match event {
            TransportEvent::CandidateGathered(_, candidate) => {
                let to = session.transport_address().clone();
                self.signaling.send_ice(to, candidate).await;
            }

            TransportEvent::StateChanged(_, state) => {
                let to = session.transport_address().clone();
                match session.handle_connection_state(state).await {
                    SessionTransition::Unchanged => {}
                    SessionTransition::Report(state) => {
                        self.notify_state(&participant_id, state).await;
                    }
                    SessionTransition::Connected => {
                        self.notify_state(&participant_id, ConnectionState::Connected)
                            .await;
                    }
                    SessionTransition::Recovering { restart_offer } => {
                        self.notify_state(&participant_id, ConnectionState::Recovering)
                            .await;
                        if let Some(sdp) = restart_offer {
                            self.signaling.send_offer(to, sdp).await;
                        }
                    }
                    SessionTransition::Fatal(e) => {
                        error!("Session with {} failed: {}", participant_id, e);
                        self.remove_session(&participant_id, ConnectionState::Failed)
                            .await;
                    }
                }
            }

            TransportEvent::RemoteTrack(_, track) => {
                if let Some(stream) = session.on_remote_track(track) {
                    info!("Remote stream from {} added", participant_id);
                    self.remote_streams.insert(stream.clone());
                    self.observer
                        .on_remote_stream_added(participant_id, stream)
                        .await;
                }
            }

            TransportEvent::DeadlineElapsed(_, deadline) => {
                if let Some(e) = session.deadline_elapsed(deadline) {
                    error!("{}", e);
                    self.remove_session(&participant_id, ConnectionState::Failed)
                        .await;
                }
            }
        }
    }

    async fn handle_local_media(&mut self, capture: LocalCapture) {
        info!("Local capture changed: {:?}", capture.track_ids());
        self.publisher.publish(&mut self.registry, &capture).await;
    }

    /// Closes and removes the session, then reports `final_state` and, if a
    /// stream had been added, its removal. No-op if there is no session.
    async fn remove_session(&mut self, participant_id: &ParticipantId, final_state: ConnectionState) {
        let Some(session) = self.registry.remove(participant_id).await else {
            return;
        };
        let had_stream = session.remote_stream().is_some();
        self.remote_streams.remove(participant_id);

        self.notify_state(participant_id, final_state).await;
        if had_stream {
            self.observer
                .on_remote_stream_removed(participant_id.clone())
                .await;
        }
    }

    async fn notify_state(&self, participant_id: &ParticipantId, state: ConnectionState) {
        self.observer
            .on_connection_state_changed(participant_id.clone(), state)
            .await;
    }

    async fn shutdown(&mut self) {
        info!(
            "Shutting down mesh room for {} ({} session(s))",
            self.local_id,
            self.registry.len()
        );

        for session in self.registry.remove_all().await {
            let participant_id = session.participant_id().clone();
            self.remote_streams.remove(&participant_id);
            self.notify_state(&participant_id, ConnectionState::Closed)
                .await;
            if session.remote_stream().is_some() {
                self.observer.on_remote_stream_removed(participant_id).await;
            }
        }

        self.departed.clear();
        self.publisher.release();
        self.command_rx.close();
    }
}
