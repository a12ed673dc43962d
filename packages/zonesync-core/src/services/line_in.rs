//! Line-in (aux) source discovery and playback.
//!
//! Discovery runs once during the scheduler's warm-up window: every node of
//! every available zone is probed for line-in attributes, and nodes
//! reporting a connected audio component become selectable aux sources.

use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::state::{AuxInput, FleetState};
use crate::zone::transport::ZoneTransport;
use crate::zone::types::ZoneId;

/// Discovers aux sources and switches zones onto them.
pub struct LineInService {
    state: Arc<FleetState>,
    transport: Arc<dyn ZoneTransport>,
}

impl LineInService {
    /// Creates a new LineInService.
    pub fn new(state: Arc<FleetState>, transport: Arc<dyn ZoneTransport>) -> Self {
        Self { state, transport }
    }

    /// Probes every node of every available zone for a usable line-in
    /// source. Both nodes of a stereo pair are probed; each connected
    /// source is listed individually.
    pub async fn discover_all(&self) {
        let mut inputs = Vec::new();
        for zone in 0..self.state.zone_count() {
            if !self.state.is_available(zone) {
                continue;
            }
            for node in self.state.node_addresses(zone) {
                match self.transport.get_line_in_attributes(&node).await {
                    Ok(attrs) if attrs.is_audio_component() => {
                        log::info!("[LineIn] Aux source '{}' on node {}", attrs.name, node);
                        inputs.push(AuxInput {
                            name: attrs.name,
                            node,
                        });
                    }
                    Ok(_) => {}
                    Err(err) => {
                        log::debug!("[LineIn] Probe failed for node {}: {}", node, err);
                    }
                }
            }
        }
        self.state.set_aux_inputs(inputs);
    }

    /// Switches a zone to one of the discovered aux sources and starts
    /// playback.
    pub async fn play_aux(&self, zone: ZoneId, aux_index: usize) -> EngineResult<()> {
        if zone >= self.state.zone_count() {
            return Err(EngineError::UnknownZone(zone));
        }
        let node = self
            .state
            .primary_node(zone)
            .ok_or(EngineError::ZoneUnavailable(zone))?;
        let inputs = self.state.aux_inputs();
        let input = inputs.get(aux_index).ok_or_else(|| {
            EngineError::InvalidRequest(format!("no aux source at index {aux_index}"))
        })?;

        self.transport.switch_to_line_in(&node, &input.node).await?;
        self.transport.play(&node).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::zone::test_fixtures::MockTransport;
    use crate::zone::transport::LineInAttributes;
    use crate::zone::types::ZoneConfig;

    fn rig() -> (Arc<FleetState>, Arc<MockTransport>, LineInService) {
        let transport = Arc::new(MockTransport::new());
        transport.add_node("10.0.0.2", "Living Room L");
        transport.add_node("10.0.0.3", "Living Room R");
        transport.add_node("10.0.0.4", "Office");

        let state = Arc::new(FleetState::new(&[
            ZoneConfig::pair("10.0.0.2", "10.0.0.3"),
            ZoneConfig::single("10.0.0.4"),
        ]));
        state.set_available(0, true);
        state.set_available(1, true);

        let service = LineInService::new(
            Arc::clone(&state),
            Arc::clone(&transport) as Arc<dyn ZoneTransport>,
        );
        (state, transport, service)
    }

    #[tokio::test]
    async fn discovery_keeps_audio_components_only() {
        let (state, transport, service) = rig();
        transport.line_in_attrs.insert(
            "10.0.0.3".to_string(),
            LineInAttributes {
                name: "Turntable".to_string(),
                kind: LineInAttributes::AUDIO_COMPONENT.to_string(),
            },
        );
        transport.line_in_attrs.insert(
            "10.0.0.4".to_string(),
            LineInAttributes {
                name: "Office".to_string(),
                kind: "LineInSource".to_string(),
            },
        );

        service.discover_all().await;

        let inputs = state.aux_inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name, "Turntable");
        // The secondary node of a pair is probed too.
        assert_eq!(inputs[0].node, "10.0.0.3");
    }

    #[tokio::test]
    async fn play_aux_switches_and_plays() {
        let (state, transport, service) = rig();
        state.set_aux_inputs(vec![AuxInput {
            name: "Turntable".to_string(),
            node: "10.0.0.3".to_string(),
        }]);

        service.play_aux(1, 0).await.unwrap();

        let commands = transport.issued_commands();
        assert_eq!(
            commands,
            vec![
                "switch_to_line_in 10.0.0.4 10.0.0.3".to_string(),
                "play 10.0.0.4".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn play_aux_rejects_unknown_source() {
        let (_state, _transport, service) = rig();
        let err = service.play_aux(1, 3).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)));
    }
}
