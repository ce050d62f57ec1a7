pub fn encode_uri_component(input: impl AsRef<[u8]>) -> String {
    form_urlencoded::byte_serialize(input.as_ref()).collect()
}
