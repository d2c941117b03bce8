use leptos::prelude::*;

use super::Ctx;
use crate::router::Route;
use crate::Poll;

/// Cards for every poll, already in display order.
#[component]
pub(super) fn PollList(polls: Vec<Poll>) -> impl IntoView {
    if polls.is_empty() {
        return view! {
            <div class="empty-state">
                <p>"No polls available. Create one to get started!"</p>
            </div>
        }
        .into_any();
    }

    view! {
        <div id="poll-list" class="poll-grid">
            {polls.into_iter().map(|poll| view! { <PollCard poll/> }).collect_view()}
        </div>
    }
    .into_any()
}

#[component]
fn PollCard(poll: Poll) -> impl IntoView {
    let ctx = expect_context::<Ctx>();
    let id = poll.id.clone();
    // progress bar saturates at 100 votes
    let progress = poll.total_votes.min(100);

    view! {
        <div class="poll-card" on:click=move |_| ctx.navigate(Route::Detail(id.clone()))>
            <h2>{poll.question.clone()}</h2>
            <ul>
                {poll.options.iter().map(|option| view! { <li>{option.clone()}</li> }).collect_view()}
            </ul>
            <div class="poll-meta">
                <span>{poll.total_votes} " votes"</span>
                <span>{poll.created_date()}</span>
            </div>
            <div class="progress">
                <div class="progress-bar" style=format!("width: {progress}%")></div>
            </div>
        </div>
    }
}
