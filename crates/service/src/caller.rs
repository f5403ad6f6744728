/// Identity of the user behind one call, resolved by the host's auth boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub display_name: String,
    pub is_admin: bool,
}

impl Caller {
    pub fn user(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { id: id.into(), display_name: display_name.into(), is_admin: false }
    }

    pub fn admin(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { id: id.into(), display_name: display_name.into(), is_admin: true }
    }
}
