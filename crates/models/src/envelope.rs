/// EnvelopeType is the kind of change carried by an Envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnvelopeType {
    New,
    Update,
    Delete,
}

/// Envelope is the unit pushed through the hub, wrapping one changed entity.
///
/// On the wire it's `{"type": "NEW" | "UPDATE" | "DELETE", "data": <entity>}`.
/// Payloads with any other `type` fail to deserialize.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "UPPERCASE")]
pub enum Envelope<T> {
    New(T),
    Update(T),
    Delete(T),
}

impl<T> Envelope<T> {
    pub fn new(type_: EnvelopeType, data: T) -> Self {
        match type_ {
            EnvelopeType::New => Self::New(data),
            EnvelopeType::Update => Self::Update(data),
            EnvelopeType::Delete => Self::Delete(data),
        }
    }

    pub fn type_(&self) -> EnvelopeType {
        match self {
            Self::New(_) => EnvelopeType::New,
            Self::Update(_) => EnvelopeType::Update,
            Self::Delete(_) => EnvelopeType::Delete,
        }
    }

    pub fn data(&self) -> &T {
        match self {
            Self::New(data) | Self::Update(data) | Self::Delete(data) => data,
        }
    }

    pub fn into_data(self) -> T {
        match self {
            Self::New(data) | Self::Update(data) | Self::Delete(data) => data,
        }
    }
}
