use atat::atat_derive::AtatResp;

/// Response type of all commands. Responses are evaluated by scanning for markers instead.
#[derive(Clone, AtatResp)]
pub struct NoResponse;
