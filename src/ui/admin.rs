use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::task::spawn_local;

use super::{Ctx, Screen, ToastKind};
use crate::poll::PollDraft;
use crate::router::Route;
use crate::{Error, ValidationError};

#[component]
pub(super) fn LoginForm() -> impl IntoView {
    let ctx = expect_context::<Ctx>();
    let (username, set_username) = signal(String::new());
    let (password, set_password) = signal(String::new());

    let on_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let (user, pass) = (username.get_untracked(), password.get_untracked());
        spawn_local(async move {
            let _loading = ctx.loading();
            match ctx.app().login(&user, &pass).await {
                Ok(()) => {
                    ctx.toast(ToastKind::Success, "Admin login successful!");
                    ctx.screen.set(Screen::Create);
                }
                Err(e) => ctx.report("Admin login failed. ", &e),
            }
        });
    };

    view! {
        <div id="admin-login-form" class="form-card">
            <h2>"Admin Login"</h2>
            <form id="login-form" on:submit=on_submit>
                <input
                    id="admin-username"
                    placeholder="Username"
                    prop:value=username
                    on:input=move |ev| set_username.set(event_target_value(&ev))
                />
                <input
                    id="admin-password"
                    type="password"
                    placeholder="Password"
                    prop:value=password
                    on:input=move |ev| set_password.set(event_target_value(&ev))
                />
                <button type="submit">"Login"</button>
                <button type="button" on:click=move |_| ctx.navigate(Route::List)>
                    "Cancel"
                </button>
            </form>
        </div>
    }
}

/// Question plus 2 to 5 option inputs.
#[component]
pub(super) fn CreatePollForm() -> impl IntoView {
    let ctx = expect_context::<Ctx>();
    let draft = RwSignal::new(PollDraft::default());

    let on_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let submitted = draft.get_untracked();
        spawn_local(async move {
            let _loading = ctx.loading();
            match ctx.app().create_poll(&submitted).await {
                Ok(_) => {
                    draft.try_set(PollDraft::default());
                    ctx.toast(ToastKind::Success, "Poll created successfully!");
                    ctx.navigate(Route::List);
                }
                Err(e @ Error::Validation(ValidationError::MissingCredentials)) => {
                    ctx.report("", &e);
                    ctx.screen.set(Screen::Login);
                }
                Err(e) => ctx.report("Failed to create poll. ", &e),
            }
        });
    };

    let on_logout = move |_| {
        ctx.app().logout();
        ctx.toast(ToastKind::Info, "Logged out.");
        ctx.navigate(Route::List);
    };

    view! {
        <div id="create-poll-form" class="form-card">
            <h2>"Create a Poll"</h2>
            <form id="new-poll-form" on:submit=on_submit>
                <textarea
                    id="poll-question"
                    placeholder="Your question"
                    rows="2"
                    prop:value=move || draft.with(|d| d.question.clone())
                    on:input=move |ev| draft.update(|d| d.question = event_target_value(&ev))
                ></textarea>
                <div id="options-container">
                    <For
                        each=move || 0..draft.with(|d| d.options().len())
                        key=|i| *i
                        children=move |i| {
                            view! {
                                <textarea
                                    name="options[]"
                                    rows="1"
                                    placeholder=format!("Option {}", i + 1)
                                    prop:value=move || {
                                        draft.with(|d| d.options().get(i).cloned().unwrap_or_default())
                                    }
                                    on:input=move |ev| {
                                        draft.update(|d| d.set_option(i, event_target_value(&ev)))
                                    }
                                ></textarea>
                            }
                        }
                    />
                </div>
                <div class="option-buttons">
                    <button
                        type="button"
                        id="add-option-btn"
                        class:hidden=move || !draft.with(|d| d.can_add())
                        on:click=move |_| draft.update(|d| {
                            d.add_option();
                        })
                    >
                        "Add Option"
                    </button>
                    <button
                        type="button"
                        id="remove-option-btn"
                        class:hidden=move || !draft.with(|d| d.can_remove())
                        on:click=move |_| draft.update(|d| {
                            d.remove_option();
                        })
                    >
                        "Remove Option"
                    </button>
                </div>
                <button type="submit">"Create Poll"</button>
                <button type="button" id="cancel-create-poll" on:click=move |_| ctx.navigate(Route::List)>
                    "Cancel"
                </button>
                <button type="button" on:click=on_logout>"Log out"</button>
            </form>
        </div>
    }
}
