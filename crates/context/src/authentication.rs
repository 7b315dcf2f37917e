/// What the inbound request told us about how it wants upstream auth handled.
///
/// The gateway's BYOK ("forward_token") providers read the client's own
/// `Authorization`/`x-api-key`/`x-goog-api-key` header straight through instead of the
/// configured upstream key; this flag records whether that header was present so routing
/// can reject forward-token providers early when it's missing.
#[derive(Default, Clone, Debug)]
pub struct Authentication {
    /// The inbound request carried a client-supplied upstream credential.
    pub has_forwarded_authorization: bool,
}
