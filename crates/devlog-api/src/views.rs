//! Server-rendered HTML pages.
//!
//! Every user-supplied string passes through [`escape`]. Live updates are
//! rendered client-side with `textContent`, never `innerHTML`.

use axum::response::Html;

use devlog_types::models::{CommunityPost, Post};

use crate::session::Identity;

const SITE_NAME: &str = "Devlog";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 200 response that pops a browser alert and navigates to `location`.
pub fn alert_redirect(message: &str, location: &str) -> Html<String> {
    // JSON string literals are valid JS string literals
    let message = serde_json::to_string(message).unwrap_or_else(|_| "\"\"".into());
    let location = serde_json::to_string(location).unwrap_or_else(|_| "\"/\"".into());
    Html(format!(
        "<script>alert({});window.location.href={};</script>",
        message, location
    ))
}

// -- Pages --

pub fn home_page(posts: &[Post], identity: Option<&Identity>) -> Html<String> {
    let mut body = String::new();
    if identity.is_none() {
        body.push_str(AUTH_FORMS);
    }

    body.push_str("<section id=\"posts\">");
    if posts.is_empty() {
        body.push_str("<p id=\"no-posts\" class=\"muted\">No updates yet.</p>");
    }
    for post in posts {
        body.push_str(&post_card(post));
    }
    body.push_str("</section>");

    layout("Updates", identity, &body, HOME_SCRIPT)
}

pub fn community_page(posts: &[CommunityPost], identity: Option<&Identity>) -> Html<String> {
    let default_name = identity.map(|i| i.username.as_str()).unwrap_or("");
    let mut body = String::new();

    match identity {
        Some(_) => body.push_str(
            "<form class=\"card stack\" action=\"/community/post\" method=\"POST\">\
             <textarea name=\"content\" rows=\"3\" placeholder=\"Start a discussion\" required></textarea>\
             <button type=\"submit\">Post</button>\
             </form>",
        ),
        None => body.push_str("<p class=\"muted\">Log in on the home page to start a discussion.</p>"),
    }

    body.push_str(&format!(
        "<template id=\"comment-form\">{}</template>",
        comment_form(None, default_name)
    ));

    body.push_str("<section id=\"community-posts\">");
    for post in posts {
        body.push_str(&community_card(post, default_name));
    }
    body.push_str("</section>");

    layout("Community", identity, &body, COMMUNITY_SCRIPT)
}

pub fn admin_page(identity: &Identity, latest_version: &str) -> Html<String> {
    let body = format!(
        "<form class=\"card stack\" action=\"/add-post\" method=\"POST\" enctype=\"multipart/form-data\">\
         <h2>Publish an update</h2>\
         <p class=\"muted\">Latest published version: {version}</p>\
         <input name=\"title\" placeholder=\"Update title\" required>\
         <input name=\"version\" placeholder=\"Version (e.g. 1.2)\" required>\
         <textarea name=\"text\" rows=\"5\" placeholder=\"What's new?\"></textarea>\
         <input type=\"file\" name=\"updateZip\" accept=\".zip\" required>\
         <button type=\"submit\">Publish &amp; Broadcast</button>\
         </form>",
        version = escape(latest_version),
    );

    layout("Admin", Some(identity), &body, "")
}

// -- Fragments --

fn layout(title: &str, identity: Option<&Identity>, body: &str, script: &str) -> Html<String> {
    let account = match identity {
        Some(identity) => {
            let admin_link = if identity.is_admin() {
                "<a href=\"/admin\">Admin</a>"
            } else {
                ""
            };
            format!(
                "{}<span>Logged in as <strong>{}</strong></span><a href=\"/logout\">Log out</a>",
                admin_link,
                escape(&identity.username)
            )
        }
        None => String::new(),
    };

    let page_script = if script.is_empty() {
        String::new()
    } else {
        format!("<script>{}{}</script>", LIVE_SCRIPT, script)
    };

    Html(format!(
        "<!DOCTYPE html>\
         <html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{title} · {site}</title>\
         <link rel=\"stylesheet\" href=\"/style.css\">\
         </head><body>\
         <nav><a href=\"/\">{site}</a><a href=\"/community\">Community</a>{account}</nav>\
         <main class=\"container\">{body}</main>\
         {page_script}\
         </body></html>",
        title = escape(title),
        site = SITE_NAME,
    ))
}

fn post_card(post: &Post) -> String {
    format!(
        "<article class=\"post\" data-id=\"{id}\">\
         <header><span class=\"tag\">{tag}</span><h2>{title}</h2>\
         <span class=\"version\">v{version}</span><time>{date}</time></header>\
         <p>{text}</p>\
         <a class=\"download\" href=\"{url}\">Download</a>\
         </article>",
        id = post.id,
        tag = escape(&post.tag),
        title = escape(&post.title),
        version = escape(&post.version),
        date = escape(&post.date),
        text = escape(&post.text),
        url = escape(&post.download_url),
    )
}

fn community_card(post: &CommunityPost, default_name: &str) -> String {
    let comments: String = post
        .comments
        .iter()
        .map(|c| {
            format!(
                "<li><strong>{}</strong> {} <time>{}</time></li>",
                escape(&c.username),
                escape(&c.text),
                escape(&c.date)
            )
        })
        .collect();

    format!(
        "<article class=\"community-post card\" data-post-id=\"{id}\">\
         <header><strong>{username}</strong><time>{date}</time></header>\
         <p>{content}</p>\
         <ul class=\"comments\">{comments}</ul>\
         {form}\
         </article>",
        id = post.id,
        username = escape(&post.username),
        date = escape(&post.date),
        content = escape(&post.content),
        form = comment_form(Some(post.id), default_name),
    )
}

fn comment_form(post_id: Option<i64>, default_name: &str) -> String {
    let data_attr = post_id
        .map(|id| format!(" data-post-id=\"{}\"", id))
        .unwrap_or_default();
    format!(
        "<form class=\"comment-form\"{data_attr}>\
         <input name=\"username\" placeholder=\"Name\" value=\"{name}\" required>\
         <input name=\"text\" placeholder=\"Write a comment\" required>\
         <button type=\"submit\">Send</button>\
         </form>",
        name = escape(default_name),
    )
}

const AUTH_FORMS: &str = "<section class=\"auth\">\
    <form class=\"card stack\" action=\"/login\" method=\"POST\">\
    <h3>Log in</h3>\
    <input name=\"username\" placeholder=\"Username\" required>\
    <input name=\"password\" type=\"password\" placeholder=\"Password\" required>\
    <button type=\"submit\">Log in</button>\
    </form>\
    <form class=\"card stack\" action=\"/register\" method=\"POST\">\
    <h3>Register</h3>\
    <input name=\"username\" placeholder=\"Username\" required>\
    <input name=\"password\" type=\"password\" placeholder=\"Password\" required>\
    <button type=\"submit\">Create account</button>\
    </form>\
    </section>";

const LIVE_SCRIPT: &str = r#"
const live = (() => {
  const handlers = {};
  let socket;
  function connect() {
    const proto = location.protocol === 'https:' ? 'wss:' : 'ws:';
    socket = new WebSocket(proto + '//' + location.host + '/ws');
    socket.onmessage = (msg) => {
      const event = JSON.parse(msg.data);
      const handler = handlers[event.type];
      if (handler) handler(event.data);
    };
    socket.onclose = () => setTimeout(connect, 3000);
  }
  connect();
  return {
    on(type, fn) { handlers[type] = fn; },
    send(type, data) {
      if (socket.readyState === WebSocket.OPEN) socket.send(JSON.stringify({ type, data }));
    },
  };
})();
function el(tag, className, text) {
  const node = document.createElement(tag);
  if (className) node.className = className;
  if (text !== undefined) node.textContent = text;
  return node;
}
"#;

const HOME_SCRIPT: &str = r#"
live.on('newPost', (post) => {
  const article = el('article', 'post');
  article.dataset.id = post.id;
  const header = el('header');
  header.append(el('span', 'tag', post.tag), el('h2', null, post.title),
    el('span', 'version', 'v' + post.version), el('time', null, post.date));
  const link = el('a', 'download', 'Download');
  link.href = post.downloadUrl;
  article.append(header, el('p', null, post.text), link);
  document.getElementById('posts').prepend(article);
  const empty = document.getElementById('no-posts');
  if (empty) empty.remove();
});
"#;

const COMMUNITY_SCRIPT: &str = r#"
function commentItem(c) {
  const li = el('li');
  li.append(el('strong', null, c.username), document.createTextNode(' ' + c.text + ' '),
    el('time', null, c.date));
  return li;
}
function wireCommentForm(form) {
  form.addEventListener('submit', (e) => {
    e.preventDefault();
    live.send('sendComment', {
      postId: Number(form.dataset.postId),
      username: form.elements.username.value,
      text: form.elements.text.value,
    });
    form.elements.text.value = '';
  });
}
document.querySelectorAll('#community-posts form.comment-form').forEach(wireCommentForm);
live.on('receiveComment', (c) => {
  const list = document.querySelector('.community-post[data-post-id="' + c.postId + '"] .comments');
  if (list) list.append(commentItem(c));
});
live.on('newCommunityPost', (p) => {
  const article = el('article', 'community-post card');
  article.dataset.postId = p.id;
  const header = el('header');
  header.append(el('strong', null, p.username), el('time', null, p.date));
  const form = document.getElementById('comment-form').content.firstElementChild.cloneNode(true);
  form.dataset.postId = p.id;
  wireCommentForm(form);
  article.append(header, el('p', null, p.content), el('ul', 'comments'), form);
  document.getElementById('community-posts').prepend(article);
});
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use devlog_types::models::{Comment, Role};

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape("<script>alert('x') & \"y\"</script>"),
            "&lt;script&gt;alert(&#39;x&#39;) &amp; &quot;y&quot;&lt;/script&gt;"
        );
    }

    #[test]
    fn alert_redirect_quotes_message() {
        let Html(page) = alert_redirect("Username \"x\" exists", "/");
        assert_eq!(
            page,
            r#"<script>alert("Username \"x\" exists");window.location.href="/";</script>"#
        );
    }

    #[test]
    fn admin_link_only_for_admins() {
        let user = Identity {
            user_id: 2,
            username: "ola".into(),
            role: Role::User,
        };
        let Html(page) = home_page(&[], Some(&user));
        assert!(!page.contains("href=\"/admin\""));
        assert!(page.contains("Logged in as <strong>ola</strong>"));

        let admin = Identity {
            role: Role::Admin,
            ..user
        };
        let Html(page) = home_page(&[], Some(&admin));
        assert!(page.contains("href=\"/admin\""));
    }

    #[test]
    fn community_comments_render_in_order() {
        let comment = |id: i64, text: &str| Comment {
            id,
            post_id: 1,
            username: "mira".into(),
            text: text.into(),
            date: "9:00:00 AM".into(),
        };
        let post = CommunityPost {
            id: 1,
            username: "ola".into(),
            content: "<b>thread</b>".into(),
            date: "1/1/2026, 9:00:00 AM".into(),
            comments: vec![comment(1, "C1"), comment(2, "C2")],
        };

        let Html(page) = community_page(&[post], None);
        let first = page.find("C1").unwrap();
        let second = page.find("C2").unwrap();
        assert!(first < second);
        assert!(page.contains("&lt;b&gt;thread&lt;/b&gt;"));
    }
}
