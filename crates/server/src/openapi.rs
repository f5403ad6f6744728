use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

/// Wire shape of a media request.
#[derive(ToSchema)]
#[schema(rename_all = "PascalCase")]
pub struct MediaRequestDoc {
    pub id: String,
    pub title: String,
    pub requested_by: String,
    pub requested_by_name: String,
    /// ISO-8601 UTC timestamp
    pub requested_date: String,
    /// Pending | Processing | Complete
    pub status: String,
    pub admin_notes: Option<String>,
}

#[derive(ToSchema)]
pub struct CreateRequestDoc { pub title: String }

#[derive(ToSchema)]
pub struct CreateOutputDoc {
    pub success: bool,
    #[schema(rename = "requestId")]
    pub request_id: String,
}

#[derive(ToSchema)]
pub struct SuccessDoc { pub success: bool }

#[derive(ToSchema)]
pub struct NotesDoc {
    #[schema(rename = "adminNotes")]
    pub admin_notes: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::requests::list,
        crate::routes::requests::create,
        crate::routes::requests::update_status,
        crate::routes::requests::update_notes,
        crate::routes::requests::delete,
    ),
    components(
        schemas(
            HealthResponse,
            MediaRequestDoc,
            CreateRequestDoc,
            CreateOutputDoc,
            SuccessDoc,
            NotesDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "requests")
    )
)]
pub struct ApiDoc;
