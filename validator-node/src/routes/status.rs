//! Read-only chain status.

use axum::{Json, extract::State};
use serde::Serialize;

use popv_chain::{Block, ChainSnapshot};

use crate::state::SharedState;

const NO_BLOCKS: &str = "No blocks yet";

/// Tip of the chain, or a placeholder string while it is empty.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LastBlock {
    Block(Box<Block>),
    Empty(&'static str),
}

#[derive(Debug, Serialize)]
pub struct BlockchainStatus {
    pub status: &'static str,
    pub chain_length: usize,
    pub last_block: LastBlock,
}

pub fn build_status(snapshot: ChainSnapshot) -> BlockchainStatus {
    BlockchainStatus {
        status: "ok",
        chain_length: snapshot.length,
        last_block: match snapshot.last_block {
            Some(block) => LastBlock::Block(Box::new(block)),
            None => LastBlock::Empty(NO_BLOCKS),
        },
    }
}

/// `GET /blockchain_status`
///
/// Reports the chain length and the last block. The snapshot may trail an
/// append that is in flight.
pub async fn blockchain_status(State(state): State<SharedState>) -> Json<BlockchainStatus> {
    Json(build_status(state.chain.snapshot()))
}
