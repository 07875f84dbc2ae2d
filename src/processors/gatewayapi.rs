//! Gateway API processor (§4.6): a thin placeholder. The cache already
//! recognizes GatewayClass/Gateway/HTTPRoute/TLSRoute/TCPRoute/GRPCRoute/
//! ReferenceGrant/BackendTLSPolicy objects for rebuild-trigger purposes
//! (§6); this processor does not yet synthesize any DAG vertices from them
//! (open question, preserved rather than invented — see DESIGN.md).

use crate::dag::Dag;
use crate::processors::ProcessorContext;

pub fn run(_dag: &mut Dag, _ctx: &ProcessorContext<'_>) {}
