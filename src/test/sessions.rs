#[cfg(test)]
mod tests {
    use crate::api::StudentsResponse;
    use crate::auth::{EMAIL_COOKIE, ROLE_COOKIE, SUBJECT_COOKIE};
    use crate::test::test_utils::{
        STANDARD_PASSWORD, STUDENT_EMAIL, TRAINER_EMAIL, create_standard_test_env,
        login_test_user, setup_test_client,
    };
    use rocket::http::{Cookie, SameSite, Status};

    #[rocket::async_test]
    async fn test_session_cookies_are_private() {
        let env = create_standard_test_env().await;
        let (client, env) = setup_test_client(env).await;

        let cookies = login_test_user(&client, STUDENT_EMAIL, STANDARD_PASSWORD).await;

        for name in [SUBJECT_COOKIE, ROLE_COOKIE, EMAIL_COOKIE] {
            let cookie = cookies
                .iter()
                .find(|c| c.name() == name)
                .unwrap_or_else(|| panic!("{} cookie not set", name));

            assert_eq!(cookie.http_only(), Some(true));
            assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        }

        let subject = cookies.iter().find(|c| c.name() == SUBJECT_COOKIE).unwrap();
        assert_ne!(subject.value(), env.subject(STUDENT_EMAIL));
    }

    #[rocket::async_test]
    async fn test_stored_role_is_trusted() {
        let env = create_standard_test_env().await;
        let (client, env) = setup_test_client(env).await;

        let response = client
            .get("/my-students")
            .private_cookie(Cookie::new(SUBJECT_COOKIE, env.subject(TRAINER_EMAIL).to_string()))
            .private_cookie(Cookie::new(ROLE_COOKIE, "Trainer"))
            .private_cookie(Cookie::new(EMAIL_COOKIE, TRAINER_EMAIL))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Ok);
        let body: StudentsResponse =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert!(body.success);
    }

    #[rocket::async_test]
    async fn test_incomplete_or_unknown_role_session_is_rejected() {
        let env = create_standard_test_env().await;
        let (client, env) = setup_test_client(env).await;
        let subject = env.subject(STUDENT_EMAIL).to_string();

        let response = client
            .get("/my-workouts")
            .private_cookie(Cookie::new(SUBJECT_COOKIE, subject.clone()))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::SeeOther);

        let response = client
            .get("/my-workouts")
            .private_cookie(Cookie::new(SUBJECT_COOKIE, subject))
            .private_cookie(Cookie::new(ROLE_COOKIE, "Admin"))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::SeeOther);
    }

    #[rocket::async_test]
    async fn test_tampered_cookie_is_rejected() {
        let env = create_standard_test_env().await;
        let (client, _) = setup_test_client(env).await;

        let cookies: Vec<Cookie<'static>> =
            login_test_user(&client, STUDENT_EMAIL, STANDARD_PASSWORD)
                .await
                .into_iter()
                .map(|mut cookie| {
                    let mut value = cookie.value().to_string();
                    value.insert(value.len() / 2, 'x');
                    cookie.set_value(value);
                    cookie
                })
                .collect();

        let response = client.get("/my-records").cookies(cookies).dispatch().await;
        assert_eq!(response.status(), Status::SeeOther);
    }
}
