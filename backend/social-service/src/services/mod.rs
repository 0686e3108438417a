pub mod barrier;
pub mod comments;
pub mod fanout;
pub mod feed;
pub mod graph;
pub mod saga;
pub mod users;
pub mod viewer_state;

pub use barrier::join_all_first_error;
pub use comments::CommentService;
pub use fanout::FanOutEngine;
pub use feed::FeedService;
pub use graph::SocialGraphService;
pub use saga::Saga;
pub use users::UserService;
pub use viewer_state::ViewerStateComposer;
