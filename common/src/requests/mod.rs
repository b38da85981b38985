use crate::model::table::TableBuffer;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug)]
/// Request payload for the save endpoint.
/// Carries the table name typed by the user and the buffer currently shown in the grid.
pub struct SaveTableRequest {
    pub table_name: String,
    pub buffer: TableBuffer,
}
