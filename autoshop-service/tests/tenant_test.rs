mod common;

use axum::http::StatusCode;
use common::{TestApp, VIN};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_records_of_another_organisation_are_invisible() {
    let app = TestApp::new();
    let acme = app.register_owner("Acme", "owner@acme.test").await;
    let globex = app.register_owner("Globex", "owner@globex.test").await;
    let shop = app.seed_shop(&acme, VIN).await;

    let (status, bill) = app.create_bill(&acme, shop.bill("20.00", None)).await;
    assert_eq!(status, StatusCode::CREATED);
    let bill_id = common::id(&bill);

    for uri in [
        format!("/api/v1/clients/{}", shop.client_id),
        format!("/api/v1/cars/{}", shop.car_id),
        format!("/api/v1/services/{}", shop.service_id),
        format!("/api/v1/bills/{}", bill_id),
    ] {
        let (status, body) = app.get(&uri, &globex.token).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri} leaked: {body}");
        assert_eq!(body["kind"], "not_found");

        let (status, _) = app.delete(&uri, &globex.token).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri} deletable across tenants");
    }

    for uri in [
        "/api/v1/clients",
        "/api/v1/cars",
        "/api/v1/services",
        "/api/v1/bills",
    ] {
        let (status, body) = app.get(uri, &globex.token).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]), "{uri} leaked across tenants");
    }

    let (status, _) = app
        .get(&format!("/api/v1/clients/{}", shop.client_id), &acme.token)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_cannot_reference_foreign_records() {
    let app = TestApp::new();
    let acme = app.register_owner("Acme", "owner@acme.test").await;
    let globex = app.register_owner("Globex", "owner@globex.test").await;
    let acme_shop = app.seed_shop(&acme, VIN).await;
    let globex_shop = app.seed_shop(&globex, "2T1BURHE0JC123456").await;

    // Car for a client of another organisation.
    let (status, body) = app
        .post(
            "/api/v1/cars",
            &globex.token,
            json!({
                "make": "Toyota",
                "model": "Corolla",
                "year": 2020,
                "vin": "JM1BL1SF7A1234567",
                "clientId": acme_shop.client_id
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Client not found");

    // Bill mixing own client and car with a foreign service.
    let mut bill = globex_shop.bill("10.00", None);
    bill["lineItems"][0]["serviceId"] = json!(acme_shop.service_id);
    let (status, body) = app.create_bill(&globex, bill).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Service not found");
}

#[tokio::test]
async fn test_employee_is_kept_out_of_owner_operations() {
    let app = TestApp::new();
    let owner = app.register_owner("Acme", "owner@acme.test").await;
    let employee = app.add_employee(&owner, "eve@acme.test").await;
    assert_eq!(employee.organisation_id, owner.organisation_id);

    let (status, body) = app.get("/api/v1/employees", &employee.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");

    let (status, _) = app
        .get(
            "/api/v1/reports/income?startDate=2025-01-01&endDate=2025-12-31",
            &employee.token,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/v1/employees",
            &employee.token,
            json!({
                "firstName": "Mallory",
                "lastName": "Sneaky",
                "email": "mallory@acme.test",
                "password": "secret1"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .put(
            "/api/v1/organisation",
            &employee.token,
            json!({ "name": "Hijacked" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Reading the organisation and day-to-day work stay open.
    let (status, body) = app.get("/api/v1/organisation", &employee.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Acme");

    let shop = app.seed_shop(&employee, VIN).await;
    let (status, bill) = app.create_bill(&employee, shop.bill("15.00", None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bill["createdById"], employee.user_id.to_string());
}

#[tokio::test]
async fn test_owner_updates_organisation() {
    let app = TestApp::new();
    let owner = app.register_owner("Acme", "owner@acme.test").await;

    let (status, body) = app
        .put(
            "/api/v1/organisation",
            &owner.token,
            json!({ "name": "Acme Motors", "location": "Springfield" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Acme Motors");
    assert_eq!(body["location"], "Springfield");
    assert_eq!(body["id"], owner.organisation_id.to_string());
}

#[tokio::test]
async fn test_owner_lists_only_own_employees() {
    let app = TestApp::new();
    let acme = app.register_owner("Acme", "owner@acme.test").await;
    let globex = app.register_owner("Globex", "owner@globex.test").await;
    app.add_employee(&acme, "eve@acme.test").await;
    app.add_employee(&acme, "adam@acme.test").await;
    app.add_employee(&globex, "gina@globex.test").await;

    let (status, body) = app.get("/api/v1/employees", &acme.token).await;
    assert_eq!(status, StatusCode::OK);
    let employees = body.as_array().unwrap();
    assert_eq!(employees.len(), 2);
    assert!(employees.iter().all(|e| e["role"] == "employee"));
    assert!(employees
        .iter()
        .all(|e| e["organisationId"] == acme.organisation_id.to_string()));
    assert!(employees.iter().all(|e| e.get("passwordHash").is_none()));
}

#[tokio::test]
async fn test_employee_deletion_rules() {
    let app = TestApp::new();
    let acme = app.register_owner("Acme", "owner@acme.test").await;
    let globex = app.register_owner("Globex", "owner@globex.test").await;
    let eve = app.add_employee(&acme, "eve@acme.test").await;
    let gina = app.add_employee(&globex, "gina@globex.test").await;

    let (status, _) = app
        .delete(&format!("/api/v1/employees/{}", Uuid::new_v4()), &acme.token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .delete(&format!("/api/v1/employees/{}", gina.user_id), &acme.token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .delete(&format!("/api/v1/employees/{}", acme.user_id), &acme.token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Cannot delete an organisation owner");

    let (status, body) = app
        .delete(&format!("/api/v1/employees/{}", eve.user_id), &acme.token)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, serde_json::Value::Null);

    let (status, _) = app.login("eve@acme.test", common::PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Gina is untouched.
    let (status, _) = app.login("gina@globex.test", common::PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_employee_email_must_be_globally_unique() {
    let app = TestApp::new();
    let acme = app.register_owner("Acme", "owner@acme.test").await;
    app.register_owner("Globex", "owner@globex.test").await;

    let (status, body) = app
        .post(
            "/api/v1/employees",
            &acme.token,
            json!({
                "firstName": "Oscar",
                "lastName": "Copy",
                "email": "Owner@Globex.test",
                "password": "secret1"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "User with this email already exists");
}
