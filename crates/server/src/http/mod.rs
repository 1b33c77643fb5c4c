use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{DeploymentImpl, routes};

pub fn router(deployment: DeploymentImpl) -> Router {
    let api_routes = Router::new()
        .merge(routes::projects::router(&deployment))
        .merge(routes::lists::router(&deployment))
        .merge(routes::cards::router(&deployment))
        .merge(routes::checklists::router(&deployment))
        .merge(routes::rooms::router(&deployment));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(deployment)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use deployment::Deployment;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{DeploymentImpl, test_support::TestEnvGuard};

    async fn setup_deployment() -> (TestEnvGuard, DeploymentImpl) {
        let temp_root = std::env::temp_dir().join(format!("corkboard-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&temp_root).unwrap();

        let db_path = temp_root.join("db.sqlite");
        let db_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        let env_guard = TestEnvGuard::new(&temp_root, db_url);

        let deployment = DeploymentImpl::new().await.unwrap();

        (env_guard, deployment)
    }

    async fn request_json(
        app: &axum::Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        let request = match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn health_check_is_public() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);

        let (status, json) = request_json(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.get("success").and_then(|v| v.as_bool()), Some(true));
    }

    #[tokio::test]
    async fn board_flow_create_move_and_read_back() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);

        let (status, project) = request_json(
            &app,
            "POST",
            "/api/projects",
            Some(json!({
                "name": "Launch plan",
                "owner_user_id": Uuid::new_v4(),
                "visibility": "private"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let project_id = project
            .pointer("/data/id")
            .and_then(|v| v.as_str())
            .unwrap()
            .to_string();

        let mut list_ids = Vec::new();
        for title in ["Todo", "Doing"] {
            let (status, list) = request_json(
                &app,
                "POST",
                &format!("/api/projects/{project_id}/lists"),
                Some(json!({ "title": title })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            list_ids.push(
                list.pointer("/data/id")
                    .and_then(|v| v.as_str())
                    .unwrap()
                    .to_string(),
            );
        }

        let mut card_ids = Vec::new();
        for title in ["A", "B"] {
            let (status, card) = request_json(
                &app,
                "POST",
                &format!("/api/lists/{}/cards", list_ids[0]),
                Some(json!({
                    "title": title,
                    "description": null,
                    "due_date": null,
                    "content_id": null
                })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            card_ids.push(
                card.pointer("/data/id")
                    .and_then(|v| v.as_str())
                    .unwrap()
                    .to_string(),
            );
        }

        let (status, moved) = request_json(
            &app,
            "PATCH",
            &format!("/api/cards/{}/move", card_ids[0]),
            Some(json!({
                "destination_list_id": list_ids[1],
                "position": 0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            moved.pointer("/data/position").and_then(|v| v.as_i64()),
            Some(0)
        );

        let (status, board) = request_json(
            &app,
            "GET",
            &format!("/api/projects/{project_id}/board"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let lists = board.pointer("/data/lists").and_then(|v| v.as_array()).unwrap();
        assert_eq!(lists.len(), 2);
        let todo_cards = lists[0].get("cards").and_then(|v| v.as_array()).unwrap();
        let doing_cards = lists[1].get("cards").and_then(|v| v.as_array()).unwrap();
        assert_eq!(todo_cards.len(), 1);
        assert_eq!(
            todo_cards[0].get("title").and_then(|v| v.as_str()),
            Some("B")
        );
        assert_eq!(
            todo_cards[0].get("position").and_then(|v| v.as_i64()),
            Some(0)
        );
        assert_eq!(doing_cards.len(), 1);
        assert_eq!(
            doing_cards[0].get("title").and_then(|v| v.as_str()),
            Some("A")
        );
    }

    #[tokio::test]
    async fn moving_unknown_card_is_404_and_bad_position_is_400() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);

        let (status, _) = request_json(
            &app,
            "PATCH",
            &format!("/api/cards/{}/move", Uuid::new_v4()),
            Some(json!({
                "destination_list_id": Uuid::new_v4(),
                "position": 0
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, project) = request_json(
            &app,
            "POST",
            "/api/projects",
            Some(json!({
                "name": "Board",
                "owner_user_id": Uuid::new_v4(),
                "visibility": "private"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let project_id = project.pointer("/data/id").and_then(|v| v.as_str()).unwrap();

        let (_, list) = request_json(
            &app,
            "POST",
            &format!("/api/projects/{project_id}/lists"),
            Some(json!({ "title": "Todo" })),
        )
        .await;
        let list_id = list.pointer("/data/id").and_then(|v| v.as_str()).unwrap();

        let (_, card) = request_json(
            &app,
            "POST",
            &format!("/api/lists/{list_id}/cards"),
            Some(json!({
                "title": "A",
                "description": null,
                "due_date": null,
                "content_id": null
            })),
        )
        .await;
        let card_id = card.pointer("/data/id").and_then(|v| v.as_str()).unwrap();

        let (status, body) = request_json(
            &app,
            "PATCH",
            &format!("/api/cards/{card_id}/move"),
            Some(json!({
                "destination_list_id": list_id,
                "position": -2
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.get("success").and_then(|v| v.as_bool()), Some(false));
    }

    #[tokio::test]
    async fn archive_via_delete_compacts_board() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);

        let (_, project) = request_json(
            &app,
            "POST",
            "/api/projects",
            Some(json!({
                "name": "Board",
                "owner_user_id": Uuid::new_v4(),
                "visibility": "private"
            })),
        )
        .await;
        let project_id = project
            .pointer("/data/id")
            .and_then(|v| v.as_str())
            .unwrap()
            .to_string();

        let (_, list) = request_json(
            &app,
            "POST",
            &format!("/api/projects/{project_id}/lists"),
            Some(json!({ "title": "Todo" })),
        )
        .await;
        let list_id = list.pointer("/data/id").and_then(|v| v.as_str()).unwrap();

        let mut card_ids = Vec::new();
        for title in ["A", "B", "C"] {
            let (_, card) = request_json(
                &app,
                "POST",
                &format!("/api/lists/{list_id}/cards"),
                Some(json!({
                    "title": title,
                    "description": null,
                    "due_date": null,
                    "content_id": null
                })),
            )
            .await;
            card_ids.push(
                card.pointer("/data/id")
                    .and_then(|v| v.as_str())
                    .unwrap()
                    .to_string(),
            );
        }

        let (status, _) = request_json(
            &app,
            "DELETE",
            &format!("/api/cards/{}", card_ids[1]),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (_, board) = request_json(
            &app,
            "GET",
            &format!("/api/projects/{project_id}/board"),
            None,
        )
        .await;
        let cards = board
            .pointer("/data/lists/0/cards")
            .and_then(|v| v.as_array())
            .unwrap();
        assert_eq!(
            cards
                .iter()
                .map(|c| (
                    c.get("title").and_then(|v| v.as_str()).unwrap().to_string(),
                    c.get("position").and_then(|v| v.as_i64()).unwrap()
                ))
                .collect::<Vec<_>>(),
            vec![("A".to_string(), 0), ("C".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn members_can_be_added_listed_and_removed() {
        let (_env_guard, deployment) = setup_deployment().await;
        let app = super::router(deployment);

        let (_, project) = request_json(
            &app,
            "POST",
            "/api/projects",
            Some(json!({
                "name": "Board",
                "owner_user_id": Uuid::new_v4(),
                "visibility": "private"
            })),
        )
        .await;
        let project_id = project
            .pointer("/data/id")
            .and_then(|v| v.as_str())
            .unwrap()
            .to_string();

        let user_id = Uuid::new_v4();
        let (status, _) = request_json(
            &app,
            "POST",
            &format!("/api/projects/{project_id}/members"),
            Some(json!({ "user_id": user_id, "user_name": "Ada" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = request_json(
            &app,
            "POST",
            &format!("/api/projects/{project_id}/members"),
            Some(json!({ "user_id": user_id, "user_name": "Ada" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, members) = request_json(
            &app,
            "GET",
            &format!("/api/projects/{project_id}/members"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            members
                .pointer("/data")
                .and_then(|v| v.as_array())
                .map(|a| a.len()),
            Some(1)
        );

        let (status, _) = request_json(
            &app,
            "DELETE",
            &format!("/api/projects/{project_id}/members/{user_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = request_json(
            &app,
            "DELETE",
            &format!("/api/projects/{project_id}/members/{user_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
