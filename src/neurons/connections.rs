//! Connection initializer.
//!
//! Every neuron of layer `i` gets one weighted edge to every neuron of layer
//! `i + 1`. Weights are recorded for inspection but are not read by the
//! propagation formula; the only runtime bookkeeping is `last_active_at`.

use std::ops::Range;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::architecture::{ConnectionId, Layer, NeuronId};

/// Initial weights are drawn uniformly from this range.
pub const WEIGHT_RANGE: Range<f64> = -0.1..0.1;

/// A directed, weighted edge between neurons of adjacent layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub from_neuron_id: NeuronId,
    pub to_neuron_id: NeuronId,
    pub weight: f64,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl Connection {
    /// Absolute weight.
    pub fn strength(&self) -> f64 {
        self.weight.abs()
    }
}

/// All connections of an architecture, indexed by [`ConnectionId`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionSet {
    connections: Vec<Connection>,
}

impl ConnectionSet {
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Stamp `last_active_at` on the given connections. Unknown ids are ignored.
    pub fn mark_active(&mut self, ids: &[ConnectionId], at: DateTime<Utc>) {
        for id in ids {
            if let Some(connection) = self.connections.get_mut(*id) {
                connection.last_active_at = Some(at);
            }
        }
    }
}

/// Build the complete bipartite connection set between adjacent layers and
/// record the outgoing ids on each source neuron.
pub fn connect<R: Rng + ?Sized>(layers: &mut [Layer], rng: &mut R) -> ConnectionSet {
    let mut connections = Vec::new();

    for i in 1..layers.len() {
        let (upstream, downstream) = layers.split_at_mut(i);
        let from_layer = &mut upstream[i - 1];
        let to_layer = &downstream[0];

        for from in from_layer.neurons.iter_mut() {
            from.outgoing_connection_ids.reserve(to_layer.neurons.len());
            for to in &to_layer.neurons {
                let id = connections.len();
                connections.push(Connection {
                    id,
                    from_neuron_id: from.id,
                    to_neuron_id: to.id,
                    weight: rng.gen_range(WEIGHT_RANGE),
                    last_active_at: None,
                });
                from.outgoing_connection_ids.push(id);
            }
        }

        debug!(
            from = %from_layer.id,
            to = %to_layer.id,
            count = from_layer.neurons.len() * to_layer.neurons.len(),
            "Connected layers"
        );
    }

    ConnectionSet { connections }
}
